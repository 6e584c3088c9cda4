//! In-memory sync ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::sync::{
    adapters::upsert_entry,
    domain::LedgerEntry,
    ports::{LedgerError, LedgerResult, SyncLedger},
};

/// Thread-safe in-memory ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<InMemoryLedgerState>>,
}

#[derive(Debug, Default)]
struct InMemoryLedgerState {
    entries: BTreeMap<String, LedgerEntry>,
    last_sync_timestamp: Option<DateTime<Utc>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger pre-populated with entries.
    #[must_use]
    pub fn with_entries(entries: impl IntoIterator<Item = LedgerEntry>) -> Self {
        let state = InMemoryLedgerState {
            entries: entries
                .into_iter()
                .map(|entry| (entry.tracking_key().to_owned(), entry))
                .collect(),
            last_sync_timestamp: None,
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }
}

fn poisoned(err: impl ToString) -> LedgerError {
    LedgerError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl SyncLedger for InMemoryLedger {
    async fn lookup(&self, tracking_key: &str) -> LedgerResult<Option<LedgerEntry>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.entries.get(tracking_key).cloned())
    }

    async fn upsert(&self, entry: &LedgerEntry) -> LedgerResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        upsert_entry(&mut state.entries, entry)
    }

    async fn entries(&self) -> LedgerResult<Vec<LedgerEntry>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.entries.values().cloned().collect())
    }

    async fn last_sync_timestamp(&self) -> LedgerResult<Option<DateTime<Utc>>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.last_sync_timestamp)
    }

    async fn record_sync_timestamp(&self, timestamp: DateTime<Utc>) -> LedgerResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.last_sync_timestamp = Some(timestamp);
        Ok(())
    }
}
