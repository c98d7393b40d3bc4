use shared::{
    domain::{FilterCriteria, NewSong, Pagination, Song, SongId, SongPatch},
    protocol::{ListSongsResponse, Statistics},
};

use super::state::Operation;

/// Everything that can happen to the catalog state: user actions and request outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Intent {
    /// Fetch the listing. `Some` replaces the active filters first.
    ListStart(Option<FilterCriteria>),
    ListSuccess(ListSongsResponse),
    ListFailure(String),
    StatisticsStart,
    StatisticsSuccess(Statistics),
    StatisticsFailure(String),
    CreateStart(NewSong),
    CreateSuccess(Song),
    UpdateStart { id: SongId, patch: SongPatch },
    UpdateSuccess(Song),
    DeleteStart(SongId),
    DeleteSuccess(SongId),
    RequestFailed { operation: Operation, message: String },
    OpenAdd,
    OpenEdit(Song),
    OpenDelete(Song),
    CloseModal,
    SetFilterCriteria(FilterCriteria),
    ResetFilters,
    SetPagination(Option<Pagination>),
    ClearError,
}

/// How a request ended, derived from its outcome intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub operation: Operation,
    pub result: Result<(), String>,
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::ListStart(_) => "list_start",
            Intent::ListSuccess(_) => "list_success",
            Intent::ListFailure(_) => "list_failure",
            Intent::StatisticsStart => "statistics_start",
            Intent::StatisticsSuccess(_) => "statistics_success",
            Intent::StatisticsFailure(_) => "statistics_failure",
            Intent::CreateStart(_) => "create_start",
            Intent::CreateSuccess(_) => "create_success",
            Intent::UpdateStart { .. } => "update_start",
            Intent::UpdateSuccess(_) => "update_success",
            Intent::DeleteStart(_) => "delete_start",
            Intent::DeleteSuccess(_) => "delete_success",
            Intent::RequestFailed { .. } => "request_failed",
            Intent::OpenAdd => "open_add",
            Intent::OpenEdit(_) => "open_edit",
            Intent::OpenDelete(_) => "open_delete",
            Intent::CloseModal => "close_modal",
            Intent::SetFilterCriteria(_) => "set_filter_criteria",
            Intent::ResetFilters => "reset_filters",
            Intent::SetPagination(_) => "set_pagination",
            Intent::ClearError => "clear_error",
        }
    }

    /// The operation this intent starts, if it is a start intent.
    pub fn started(&self) -> Option<Operation> {
        match self {
            Intent::ListStart(_) => Some(Operation::List),
            Intent::StatisticsStart => Some(Operation::Statistics),
            Intent::CreateStart(_) => Some(Operation::Create),
            Intent::UpdateStart { .. } => Some(Operation::Update),
            Intent::DeleteStart(_) => Some(Operation::Delete),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        let (operation, result) = match self {
            Intent::ListSuccess(_) => (Operation::List, Ok(())),
            Intent::ListFailure(message) => (Operation::List, Err(message.clone())),
            Intent::StatisticsSuccess(_) => (Operation::Statistics, Ok(())),
            Intent::StatisticsFailure(message) => (Operation::Statistics, Err(message.clone())),
            Intent::CreateSuccess(_) => (Operation::Create, Ok(())),
            Intent::UpdateSuccess(_) => (Operation::Update, Ok(())),
            Intent::DeleteSuccess(_) => (Operation::Delete, Ok(())),
            Intent::RequestFailed { operation, message } => (*operation, Err(message.clone())),
            _ => return None,
        };
        Some(Outcome { operation, result })
    }
}
