//! Error types for sync domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing sync domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncDomainError {
    /// The sync direction value is unsupported.
    #[error("unsupported sync direction '{0}', expected source-to-target, target-to-source or both")]
    InvalidDirection(String),

    /// The state category value is unsupported.
    #[error("unknown state category: {0}")]
    InvalidCategory(String),

    /// A state mapping key is empty after trimming.
    #[error("state mapping keys must not be empty")]
    EmptyStateName,

    /// Source and target providers report the same name.
    #[error("source and target providers must have distinct names, both are '{0}'")]
    DuplicateProviderName(String),

    /// A provider reported an empty name.
    #[error("provider name must not be empty")]
    EmptyProviderName,
}
