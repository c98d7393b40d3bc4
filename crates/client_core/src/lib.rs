//! Client-side request orchestration for the song catalog.
//!
//! Views dispatch [`store::Intent`]s to a [`store::Store`]; the
//! [`orchestrator::Orchestrator`] turns start intents into calls on a
//! [`transport::CatalogApi`] and dispatches their outcomes back.

pub mod error;
pub mod orchestrator;
pub mod store;
pub mod transport;
pub mod validation;

pub use error::CatalogError;
pub use orchestrator::{Orchestrator, OrchestratorHandle};
pub use store::{wait_for_outcome, CatalogState, Intent, ModalContext, Operation, Outcome, Store};
pub use transport::{CatalogApi, HttpCatalogClient, DEFAULT_BASE_URL};
pub use validation::{FormErrors, SongForm};
