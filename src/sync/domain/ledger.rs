//! Ledger records of linked issue pairs.

use super::Fingerprint;
use serde::{Deserialize, Serialize};

/// The persisted link between a source issue and a target issue.
///
/// Entries are keyed by their [`tracking_key`](Self::tracking_key), which is
/// the source issue identifier. Once created, only the fingerprint changes.
///
/// The fingerprint is the content both sides agreed on after the last applied
/// change. Which side wins a linked pair is decided by `updated_at` and the
/// field diff alone; the fingerprint is carried into conflict reports so a
/// reviewer can tell which side moved since the last sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    source_id: String,
    target_id: String,
    last_fingerprint: Fingerprint,
    #[serde(default)]
    is_derived_item: bool,
}

impl LedgerEntry {
    /// Creates an entry for a newly linked pair.
    #[must_use]
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        last_fingerprint: Fingerprint,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            last_fingerprint,
            is_derived_item: false,
        }
    }

    /// Marks the pair as a derived (sub-)item.
    #[must_use]
    pub const fn derived(mut self, is_derived_item: bool) -> Self {
        self.is_derived_item = is_derived_item;
        self
    }

    /// Returns the key under which the entry is stored.
    #[must_use]
    pub fn tracking_key(&self) -> &str {
        &self.source_id
    }

    /// Returns the source issue identifier.
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Returns the target issue identifier.
    #[must_use]
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Returns the fingerprint recorded after the last propagated change.
    ///
    /// Informational: reconciliation decisions never read it.
    #[must_use]
    pub const fn last_fingerprint(&self) -> &Fingerprint {
        &self.last_fingerprint
    }

    /// Returns `true` for derived (sub-)items.
    #[must_use]
    pub const fn is_derived_item(&self) -> bool {
        self.is_derived_item
    }

    /// Returns `true` when `other` describes the same linked pair.
    #[must_use]
    pub fn same_link(&self, other: &Self) -> bool {
        self.source_id == other.source_id && self.target_id == other.target_id
    }

    /// Records a new fingerprint after a propagated change.
    pub fn refresh(&mut self, fingerprint: Fingerprint) {
        self.last_fingerprint = fingerprint;
    }
}
