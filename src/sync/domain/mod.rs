//! Domain model for issue reconciliation.
//!
//! Pure data and pure functions only: the canonical issue model, state
//! folding, fingerprints, field diffs and cross-system matching. Nothing in
//! here performs I/O or fails on well-formed input.

mod config;
mod diff;
mod error;
mod fingerprint;
mod issue;
mod label;
mod ledger;
mod matching;
mod report;
mod state;

pub use config::{SyncDirection, SyncOptions};
pub use diff::{FieldDifference, FieldValue, IssueField, diff, differing_fields, field_matches};
pub use error::SyncDomainError;
pub use fingerprint::{Fingerprint, IssueContent, normalized_set};
pub use issue::{IssueLink, IssueMetadata, IssuePatch, NewIssue, NormalizedIssue};
pub use label::{NormalizedLabel, normalize_key};
pub use ledger::LedgerEntry;
pub use matching::{AmbiguousMatch, IssuePair, MatchReport, PairStatus, match_issues};
pub use report::{
    ChangeKind, IssueChange, IssueConflict, ProposedChange, ProviderRole, SyncError,
    SyncErrorKind, SyncErrorScope, SyncResult, SyncSummary,
};
pub use state::{NormalizedState, StateCategory, StateMappingConfig, category_of};

/// Label attached to target issues whose source record disappeared.
pub const CANCELLED_LABEL: &str = "Cancelled";
