//! Adapter implementations of the sync ports.

pub mod file;
pub mod memory;

use crate::sync::{
    domain::LedgerEntry,
    ports::{LedgerError, LedgerResult},
};
use std::collections::BTreeMap;

/// Inserts a new entry or refreshes the fingerprint of the existing one.
fn upsert_entry(
    entries: &mut BTreeMap<String, LedgerEntry>,
    entry: &LedgerEntry,
) -> LedgerResult<()> {
    match entries.get_mut(entry.tracking_key()) {
        Some(existing) if !existing.same_link(entry) => Err(LedgerError::LinkMismatch {
            tracking_key: entry.tracking_key().to_owned(),
            recorded: existing.target_id().to_owned(),
            proposed: entry.target_id().to_owned(),
        }),
        Some(existing) => {
            existing.refresh(entry.last_fingerprint().clone());
            Ok(())
        }
        None => {
            entries.insert(entry.tracking_key().to_owned(), entry.clone());
            Ok(())
        }
    }
}
