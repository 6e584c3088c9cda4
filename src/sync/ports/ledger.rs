//! Ledger port: the persisted record of linked pairs.

use crate::sync::domain::LedgerEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Append/update-only store of linked issue pairs.
///
/// There is deliberately no delete: entries outlive the issues they link,
/// including targets that were cancelled after their source disappeared.
/// A single engine instance is the only writer.
#[async_trait]
pub trait SyncLedger: Send + Sync {
    /// Finds the entry stored under `tracking_key`.
    async fn lookup(&self, tracking_key: &str) -> LedgerResult<Option<LedgerEntry>>;

    /// Creates an entry or refreshes the fingerprint of an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::LinkMismatch`] when an entry exists under the
    /// same key but links a different pair.
    async fn upsert(&self, entry: &LedgerEntry) -> LedgerResult<()>;

    /// Returns every entry, ordered by tracking key.
    async fn entries(&self) -> LedgerResult<Vec<LedgerEntry>>;

    /// Returns the completion time of the last successful run.
    async fn last_sync_timestamp(&self) -> LedgerResult<Option<DateTime<Utc>>>;

    /// Records the completion time of a successful run.
    async fn record_sync_timestamp(&self, timestamp: DateTime<Utc>) -> LedgerResult<()>;
}

/// Errors returned by ledger implementations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// An entry exists under the key but links a different pair.
    #[error("ledger entry {tracking_key} links target {recorded}, refusing to relink to {proposed}")]
    LinkMismatch {
        /// Tracking key of the entry.
        tracking_key: String,
        /// Target identifier already recorded.
        recorded: String,
        /// Target identifier proposed by the upsert.
        proposed: String,
    },

    /// The stored ledger could not be decoded.
    #[error("ledger is corrupt: {0}")]
    Corrupt(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
