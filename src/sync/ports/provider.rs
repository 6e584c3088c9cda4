//! Provider port: normalized CRUD over one issue-tracking backend.

use crate::sync::domain::{
    IssuePatch, NewIssue, NormalizedIssue, NormalizedLabel, NormalizedState, StateMappingConfig,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Normalized access to one issue tracker.
///
/// Implementations own all transport concerns (authentication, pagination,
/// timeouts) and translate provider payloads to and from the canonical model.
#[async_trait]
pub trait IssueProvider: Send + Sync {
    /// Fetches every issue in scope.
    async fn get_issues(&self) -> ProviderResult<Vec<NormalizedIssue>>;

    /// Fetches a single issue by provider-local identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] when no such issue exists.
    async fn get_issue(&self, id: &str) -> ProviderResult<NormalizedIssue>;

    /// Creates an issue and returns it as stored.
    async fn create_issue(&self, issue: NewIssue) -> ProviderResult<NormalizedIssue>;

    /// Applies a partial update and returns the issue as stored.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] when no such issue exists.
    async fn update_issue(&self, id: &str, patch: IssuePatch) -> ProviderResult<NormalizedIssue>;

    /// Closes an issue. Never a hard delete.
    async fn delete_issue(&self, id: &str) -> ProviderResult<()>;

    /// Lists the labels available in scope.
    async fn get_labels(&self) -> ProviderResult<Vec<NormalizedLabel>>;

    /// Lists the workflow states available in scope.
    async fn get_states(&self) -> ProviderResult<Vec<NormalizedState>>;

    /// Returns the stable provider name.
    fn name(&self) -> &str;

    /// Returns the table folding this provider's states into categories.
    fn state_mapping_config(&self) -> &StateMappingConfig;

    /// Returns `true` when `issue` was fetched from this provider.
    fn is_source_of_truth(&self, issue: &NormalizedIssue) -> bool {
        issue.source_provider == self.name()
    }
}

/// Errors returned by provider adapters.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider is throttling requests; transient.
    #[error("rate limited by {provider}: {message}")]
    RateLimited {
        /// Provider name.
        provider: String,
        /// Provider detail.
        message: String,
    },

    /// A referenced issue, state, label or project does not exist.
    #[error("{resource} not found in {provider}")]
    NotFound {
        /// Provider name.
        provider: String,
        /// Description of the missing resource.
        resource: String,
    },

    /// The provider refused the request as invalid.
    #[error("{provider} rejected the request: {message}")]
    Rejected {
        /// Provider name.
        provider: String,
        /// Provider detail.
        message: String,
    },

    /// Network or server failure.
    #[error("transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Creates a rate-limit signal.
    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(provider: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::NotFound {
            provider: provider.into(),
            resource: resource.into(),
        }
    }

    /// Creates a rejection error.
    pub fn rejected(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Returns `true` for the transient rate-limit signal.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
