//! Review port: an optional gate consulted before each mutation.

use crate::sync::domain::ProposedChange;
use async_trait::async_trait;

/// A reviewer's verdict on a proposed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewDecision {
    /// Apply the change.
    Accept,
    /// Leave both sides untouched for this run.
    Reject,
}

/// Decides whether a proposed change may be applied.
///
/// Interactive approval, policy filters and audit hooks are all adapters over
/// this trait; the engine itself never blocks on a terminal.
#[async_trait]
pub trait ChangeReviewer: Send + Sync {
    /// Reviews a single proposed change.
    async fn review(&self, change: &ProposedChange) -> ReviewDecision;
}

/// Reviewer that accepts every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

#[async_trait]
impl ChangeReviewer for AcceptAll {
    async fn review(&self, _change: &ProposedChange) -> ReviewDecision {
        ReviewDecision::Accept
    }
}
