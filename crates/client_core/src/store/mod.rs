//! Client-side catalog state.
//!
//! The [`Store`] owns one [`CatalogState`] and changes it only by running
//! [`CatalogReducer`] over dispatched intents. Every dispatched intent is then
//! broadcast so views can react to it. Start intents and outcomes also go out
//! on unbounded feeds, so the orchestrator and outcome waiters never miss one.

mod intent;
mod reducer;
mod state;

use std::sync::{Arc, Mutex, PoisonError};

use futures::{stream::BoxStream, StreamExt};
use shared::protocol::ListSongsQuery;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

pub use intent::{Intent, Outcome};
pub use reducer::{CatalogReducer, Reducer};
pub use state::{CatalogState, ModalContext, Operation, OperationState, PageInfo, RequestState};

const INTENT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: watch::Sender<CatalogState>,
    intents: broadcast::Sender<Intent>,
    feeds: Mutex<Feeds>,
}

#[derive(Default)]
struct Feeds {
    requests: Vec<mpsc::UnboundedSender<StartedRequest>>,
    outcomes: Vec<mpsc::UnboundedSender<Outcome>>,
}

impl Feeds {
    fn publish(&mut self, intent: &Intent, state: &CatalogState) {
        if intent.started().is_some() && !self.requests.is_empty() {
            let request = StartedRequest {
                intent: intent.clone(),
                list_query: state.list_query(),
            };
            self.requests.retain(|tx| tx.send(request.clone()).is_ok());
        }
        if let Some(outcome) = intent.outcome() {
            self.outcomes.retain(|tx| tx.send(outcome.clone()).is_ok());
        }
    }
}

/// A start intent as reduced, with the listing query the state held right after it.
#[derive(Debug, Clone)]
pub struct StartedRequest {
    pub intent: Intent,
    pub list_query: ListSongsQuery,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(CatalogState::default())
    }

    pub fn with_state(state: CatalogState) -> Self {
        let (state, _) = watch::channel(state);
        let (intents, _) = broadcast::channel(INTENT_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                state,
                intents,
                feeds: Mutex::default(),
            }),
        }
    }

    /// Applies `intent` and then announces it to subscribers.
    ///
    /// Subscribers receive intents in the order they were reduced.
    pub fn dispatch(&self, intent: Intent) {
        debug!(intent = intent.name(), "dispatch");
        let inner = &self.inner;
        inner.state.send_modify(move |state| {
            *state = CatalogReducer::reduce(std::mem::take(state), intent.clone());
            inner.lock_feeds().publish(&intent, state);
            // No subscribers is not an error.
            let _ = inner.intents.send(intent);
        });
    }

    pub fn snapshot(&self) -> CatalogState {
        self.inner.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<CatalogState> {
        self.inner.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Intent> {
        self.inner.intents.subscribe()
    }

    /// Every start intent dispatched after this call, in reduction order.
    pub fn requests(&self) -> mpsc::UnboundedReceiver<StartedRequest> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock_feeds().requests.push(tx);
        rx
    }

    /// Completions of requests dispatched after this call.
    pub fn outcomes(&self) -> BoxStream<'static, Outcome> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock_feeds().outcomes.push(tx);
        UnboundedReceiverStream::new(rx).boxed()
    }
}

impl StoreInner {
    fn lock_feeds(&self) -> std::sync::MutexGuard<'_, Feeds> {
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Waits for the next outcome of `operation`. `None` once the store is gone.
pub async fn wait_for_outcome(
    outcomes: &mut BoxStream<'static, Outcome>,
    operation: Operation,
) -> Option<Outcome> {
    while let Some(outcome) = outcomes.next().await {
        if outcome.operation == operation {
            return Some(outcome);
        }
    }
    None
}

#[cfg(test)]
#[path = "../tests/store_tests.rs"]
mod tests;
