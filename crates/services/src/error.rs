//! Shared error types for the services crate.

use thiserror::Error;

use storage::StorageError;

/// Errors emitted by session services.
///
/// Engine operations themselves never fail; these cover the orchestration
/// around them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session is not completed yet")]
    NotCompleted,
    #[error("session state lock poisoned")]
    LockPoisoned,
    #[error("grading task did not finish")]
    GradingAborted,
    #[error(transparent)]
    Storage(#[from] StorageError),
}
