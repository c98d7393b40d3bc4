use std::sync::Arc;

use shared::protocol::ListSongsQuery;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    error::CatalogError,
    store::{Intent, Operation, StartedRequest, Store},
    transport::CatalogApi,
};

/// Runs the remote call behind every start intent dispatched to a [`Store`].
pub struct Orchestrator;

/// Keeps the orchestrator loop alive. Dropping it stops intake of new intents;
/// requests already in flight still report their outcome.
pub struct OrchestratorHandle {
    task: JoinHandle<()>,
}

impl Drop for OrchestratorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Orchestrator {
    pub fn spawn(api: Arc<dyn CatalogApi>, store: Store) -> OrchestratorHandle {
        // Register before the task starts so no early dispatch is missed.
        let mut requests = store.requests();
        let task = tokio::spawn(async move {
            while let Some(request) = requests.recv().await {
                if let Some(operation) = request.intent.started() {
                    debug!(operation = operation.name(), "starting effect");
                }
                tokio::spawn(run_effect(api.clone(), store.clone(), request));
            }
        });
        OrchestratorHandle { task }
    }
}

async fn run_effect(api: Arc<dyn CatalogApi>, store: Store, request: StartedRequest) {
    let StartedRequest { intent, list_query } = request;
    for outcome in perform(api.as_ref(), &list_query, intent).await {
        store.dispatch(outcome);
    }
}

/// Performs the request for a start intent and returns the intents to dispatch, in order.
///
/// Listings use `list_query`, the filters and pagination in effect when the
/// start intent was reduced.
pub async fn perform(
    api: &dyn CatalogApi,
    list_query: &ListSongsQuery,
    intent: Intent,
) -> Vec<Intent> {
    match intent {
        Intent::ListStart(_) => match api.list(list_query).await {
            Ok(response) => vec![Intent::ListSuccess(response)],
            Err(err) => {
                warn!(%err, "listing songs failed");
                vec![Intent::ListFailure(err.to_string())]
            }
        },
        Intent::StatisticsStart => match api.statistics().await {
            Ok(statistics) => vec![Intent::StatisticsSuccess(statistics)],
            Err(err) => {
                warn!(%err, "loading statistics failed");
                vec![Intent::StatisticsFailure(err.to_string())]
            }
        },
        Intent::CreateStart(song) => match api.create(&song).await {
            Ok(created) => after_mutation(Intent::CreateSuccess(created)),
            Err(err) => failed(Operation::Create, err),
        },
        Intent::UpdateStart { id, patch } => match api.update(&id, &patch).await {
            Ok(updated) => after_mutation(Intent::UpdateSuccess(updated)),
            Err(err) => failed(Operation::Update, err),
        },
        Intent::DeleteStart(id) => match api.delete(&id).await {
            Ok(()) => after_mutation(Intent::DeleteSuccess(id)),
            Err(err) => failed(Operation::Delete, err),
        },
        _ => Vec::new(),
    }
}

fn after_mutation(success: Intent) -> Vec<Intent> {
    vec![success, Intent::CloseModal, Intent::StatisticsStart]
}

fn failed(operation: Operation, err: CatalogError) -> Vec<Intent> {
    warn!(operation = operation.name(), %err, "catalog request failed");
    vec![Intent::RequestFailed {
        operation,
        message: err.to_string(),
    }]
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
