//! Application services orchestrating reconciliation runs.

pub(crate) mod apply;
mod engine;
pub mod retry;

pub use engine::ReconciliationEngine;
pub use retry::{MAX_RATE_LIMIT_RETRIES, RetryPolicy};

use crate::sync::domain::SyncDomainError;
use thiserror::Error;

/// Errors raised while setting up the reconciliation service.
///
/// Once constructed, a run never fails as a whole; see
/// [`ReconciliationEngine::sync`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncServiceError {
    /// The engine configuration is invalid.
    #[error(transparent)]
    Validation(#[from] SyncDomainError),
}

/// Result type for reconciliation service setup.
pub type SyncServiceResult<T> = Result<T, SyncServiceError>;
