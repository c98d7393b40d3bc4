use shared::{
    domain::{FilterCriteria, Pagination, Song},
    protocol::{ListSongsQuery, ListSongsResponse, Statistics},
};

/// Kinds of remote request the store tracks independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Statistics,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::Statistics,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Statistics => "statistics",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    fn slot(self) -> usize {
        match self {
            Operation::List => 0,
            Operation::Statistics => 1,
            Operation::Create => 2,
            Operation::Update => 3,
            Operation::Delete => 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationState {
    pub in_flight: u32,
    pub error: Option<String>,
}

/// Per-operation loading and error tracking plus the latest-failure banner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestState {
    operations: [OperationState; 5],
    pub error: Option<String>,
}

impl RequestState {
    pub fn operation(&self, operation: Operation) -> &OperationState {
        &self.operations[operation.slot()]
    }

    pub fn is_loading(&self) -> bool {
        self.operations.iter().any(|op| op.in_flight > 0)
    }

    pub fn is_pending(&self, operation: Operation) -> bool {
        self.operation(operation).in_flight > 0
    }

    pub fn error_for(&self, operation: Operation) -> Option<&str> {
        self.operation(operation).error.as_deref()
    }

    pub(crate) fn start(&mut self, operation: Operation) {
        let slot = &mut self.operations[operation.slot()];
        slot.in_flight = slot.in_flight.saturating_add(1);
        // A background statistics refresh must not hide the failure that preceded it.
        if operation != Operation::Statistics {
            self.error = None;
        }
    }

    pub(crate) fn succeed(&mut self, operation: Operation) {
        let slot = &mut self.operations[operation.slot()];
        slot.in_flight = slot.in_flight.saturating_sub(1);
        slot.error = None;
        self.error = None;
    }

    pub(crate) fn fail(&mut self, operation: Operation, message: String) {
        let slot = &mut self.operations[operation.slot()];
        slot.in_flight = slot.in_flight.saturating_sub(1);
        slot.error = Some(message.clone());
        self.error = Some(message);
    }
}

/// The single active modal dialog, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModalContext {
    #[default]
    None,
    Add,
    Edit(Song),
    Delete(Song),
}

impl ModalContext {
    pub fn is_open(&self) -> bool {
        !matches!(self, ModalContext::None)
    }

    pub fn editing(&self) -> Option<&Song> {
        match self {
            ModalContext::Edit(song) => Some(song),
            _ => None,
        }
    }

    pub fn deleting(&self) -> Option<&Song> {
        match self {
            ModalContext::Delete(song) => Some(song),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u32,
}

impl From<&ListSongsResponse> for PageInfo {
    fn from(response: &ListSongsResponse) -> Self {
        Self {
            total: response.total,
            total_pages: response.total_pages,
            current_page: response.current_page,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogState {
    pub songs: Vec<Song>,
    pub page: PageInfo,
    pub statistics: Option<Statistics>,
    pub filters: FilterCriteria,
    pub pagination: Option<Pagination>,
    pub modal: ModalContext,
    pub requests: RequestState,
}

impl CatalogState {
    pub fn is_loading(&self) -> bool {
        self.requests.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.requests.error.as_deref()
    }

    pub fn list_query(&self) -> ListSongsQuery {
        ListSongsQuery::new(self.filters.clone(), self.pagination)
    }
}
