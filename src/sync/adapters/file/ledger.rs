//! JSON ledger stored in an injected directory.
//!
//! The whole ledger is a single document holding the keyed entry set and the
//! last successful sync time. Writes go through a temporary file followed by
//! a rename inside the same directory handle, so a crashed write leaves the
//! previous document intact.

use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::sync::RwLock;

use crate::sync::{
    adapters::upsert_entry,
    domain::LedgerEntry,
    ports::{LedgerError, LedgerResult, SyncLedger},
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_sync_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: BTreeMap<String, LedgerEntry>,
}

/// Ledger persisted as pretty-printed JSON.
#[derive(Debug)]
pub struct FileLedger {
    dir: Dir,
    document: RwLock<LedgerDocument>,
}

impl FileLedger {
    /// Name of the ledger document inside the storage directory.
    pub const FILE_NAME: &'static str = "sync-ledger.json";

    const TEMP_FILE_NAME: &'static str = "sync-ledger.json.tmp";

    /// Opens (or starts) the ledger stored in `directory`.
    ///
    /// The directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when the directory cannot be
    /// opened or read and [`LedgerError::Corrupt`] when an existing document
    /// cannot be decoded.
    pub fn open(directory: &Utf8Path) -> LedgerResult<Self> {
        let dir =
            Dir::open_ambient_dir(directory, ambient_authority()).map_err(LedgerError::persistence)?;
        Self::from_dir(dir)
    }

    /// Opens the ledger stored in an already opened directory handle.
    ///
    /// # Errors
    ///
    /// See [`FileLedger::open`].
    pub fn from_dir(dir: Dir) -> LedgerResult<Self> {
        let document = match dir.read_to_string(Self::FILE_NAME) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|err| LedgerError::Corrupt(err.to_string()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => LedgerDocument::default(),
            Err(err) => return Err(LedgerError::persistence(err)),
        };
        Ok(Self {
            dir,
            document: RwLock::new(document),
        })
    }

    fn persist(&self, document: &LedgerDocument) -> LedgerResult<()> {
        let encoded = serde_json::to_string_pretty(document)
            .map_err(|err| LedgerError::Corrupt(err.to_string()))?;
        self.dir
            .write(Self::TEMP_FILE_NAME, encoded)
            .map_err(LedgerError::persistence)?;
        self.dir
            .rename(Self::TEMP_FILE_NAME, &self.dir, Self::FILE_NAME)
            .map_err(LedgerError::persistence)
    }

    /// Applies `change` to a copy of the document and commits it only once
    /// the copy is on disk.
    fn commit(
        &self,
        change: impl FnOnce(&mut LedgerDocument) -> LedgerResult<()>,
    ) -> LedgerResult<()> {
        let mut document = self.document.write().map_err(poisoned)?;
        let mut next = LedgerDocument {
            last_sync_timestamp: document.last_sync_timestamp,
            entries: document.entries.clone(),
        };
        change(&mut next)?;
        self.persist(&next)?;
        *document = next;
        Ok(())
    }
}

fn poisoned(err: impl ToString) -> LedgerError {
    LedgerError::persistence(io::Error::other(err.to_string()))
}

#[async_trait]
impl SyncLedger for FileLedger {
    async fn lookup(&self, tracking_key: &str) -> LedgerResult<Option<LedgerEntry>> {
        let document = self.document.read().map_err(poisoned)?;
        Ok(document.entries.get(tracking_key).cloned())
    }

    async fn upsert(&self, entry: &LedgerEntry) -> LedgerResult<()> {
        self.commit(|document| upsert_entry(&mut document.entries, entry))
    }

    async fn entries(&self) -> LedgerResult<Vec<LedgerEntry>> {
        let document = self.document.read().map_err(poisoned)?;
        Ok(document.entries.values().cloned().collect())
    }

    async fn last_sync_timestamp(&self) -> LedgerResult<Option<DateTime<Utc>>> {
        let document = self.document.read().map_err(poisoned)?;
        Ok(document.last_sync_timestamp)
    }

    async fn record_sync_timestamp(&self, timestamp: DateTime<Utc>) -> LedgerResult<()> {
        self.commit(|document| {
            document.last_sync_timestamp = Some(timestamp);
            Ok(())
        })
    }
}
