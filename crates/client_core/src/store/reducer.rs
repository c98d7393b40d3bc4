use shared::domain::FilterCriteria;

use super::{
    intent::Intent,
    state::{CatalogState, ModalContext, Operation, PageInfo},
};

/// Pure state transition: `(State, Intent) -> State`, no I/O.
pub trait Reducer {
    type State;
    type Intent;

    fn reduce(state: Self::State, intent: Self::Intent) -> Self::State;
}

pub struct CatalogReducer;

impl Reducer for CatalogReducer {
    type State = CatalogState;
    type Intent = Intent;

    fn reduce(mut state: CatalogState, intent: Intent) -> CatalogState {
        match intent {
            Intent::ListStart(criteria) => {
                state.requests.start(Operation::List);
                if let Some(criteria) = criteria {
                    state.filters = criteria;
                }
            }
            Intent::ListSuccess(response) => {
                state.page = PageInfo::from(&response);
                state.songs = response.songs;
                state.requests.succeed(Operation::List);
            }
            Intent::ListFailure(message) => state.requests.fail(Operation::List, message),

            Intent::StatisticsStart => state.requests.start(Operation::Statistics),
            Intent::StatisticsSuccess(statistics) => {
                state.statistics = Some(statistics);
                state.requests.succeed(Operation::Statistics);
            }
            Intent::StatisticsFailure(message) => {
                state.requests.fail(Operation::Statistics, message)
            }

            Intent::CreateStart(_) => state.requests.start(Operation::Create),
            Intent::CreateSuccess(song) => {
                state.songs.push(song);
                state.page.total += 1;
                state.requests.succeed(Operation::Create);
            }

            Intent::UpdateStart { .. } => state.requests.start(Operation::Update),
            Intent::UpdateSuccess(song) => {
                if let Some(existing) = state.songs.iter_mut().find(|s| s.id == song.id) {
                    *existing = song;
                }
                if matches!(state.modal, ModalContext::Edit(_)) {
                    state.modal = ModalContext::None;
                }
                state.requests.succeed(Operation::Update);
            }

            Intent::DeleteStart(_) => state.requests.start(Operation::Delete),
            Intent::DeleteSuccess(id) => {
                let before = state.songs.len();
                state.songs.retain(|song| song.id != id);
                if state.songs.len() < before {
                    state.page.total = state.page.total.saturating_sub(1);
                }
                if matches!(state.modal, ModalContext::Delete(_)) {
                    state.modal = ModalContext::None;
                }
                state.requests.succeed(Operation::Delete);
            }

            Intent::RequestFailed { operation, message } => {
                state.requests.fail(operation, message)
            }

            Intent::OpenAdd => state.modal = ModalContext::Add,
            Intent::OpenEdit(song) => state.modal = ModalContext::Edit(song),
            Intent::OpenDelete(song) => state.modal = ModalContext::Delete(song),
            Intent::CloseModal => state.modal = ModalContext::None,

            Intent::SetFilterCriteria(criteria) => state.filters = criteria,
            Intent::ResetFilters => state.filters = FilterCriteria::default(),
            Intent::SetPagination(pagination) => state.pagination = pagination,
            Intent::ClearError => state.requests.error = None,
        }
        state
    }
}
