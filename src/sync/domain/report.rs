//! Pure result values produced by a reconciliation run.

use super::{FieldDifference, Fingerprint, IssueField, NormalizedIssue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two fixed roles a provider can play in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderRole {
    /// The system issues originate from.
    Source,
    /// The system issues are mirrored into.
    Target,
}

impl ProviderRole {
    /// Returns the other role.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Source => Self::Target,
            Self::Target => Self::Source,
        }
    }

    /// Returns the role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for ProviderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a propagated change did to the receiving provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A new issue was created.
    Create,
    /// An existing unlinked issue was linked and brought up to date.
    Link,
    /// A linked issue was updated.
    Update,
    /// An orphaned issue was moved to Done and marked cancelled.
    Cancel,
}

impl ChangeKind {
    /// Returns the report name of the change kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Link => "link",
            Self::Update => "update",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change propagated (or, in a dry run, planned) by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueChange {
    /// Name of the provider whose data was propagated.
    pub source: String,
    /// What happened on the receiving side.
    pub kind: ChangeKind,
    /// The receiving issue after the change.
    pub issue: NormalizedIssue,
}

/// A linked pair whose concurrent edits cannot be resolved automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueConflict {
    /// The source side of the pair.
    pub source_issue: NormalizedIssue,
    /// The target side of the pair.
    pub target_issue: NormalizedIssue,
    /// Fingerprint recorded after the pair was last synchronised.
    pub last_sync_fingerprint: Option<Fingerprint>,
    /// Fields whose values disagree, in comparison order.
    pub conflicting_fields: Vec<FieldDifference>,
}

impl IssueConflict {
    /// Returns the names of the conflicting fields.
    #[must_use]
    pub fn field_names(&self) -> Vec<IssueField> {
        self.conflicting_fields
            .iter()
            .map(|difference| difference.field)
            .collect()
    }
}

/// A change offered to a reviewer before it is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedChange {
    /// What the change would do.
    pub kind: ChangeKind,
    /// The provider that would be mutated.
    pub receiver: ProviderRole,
    /// The issue whose data would be propagated.
    pub origin: NormalizedIssue,
    /// The issue that would be mutated; `None` for creations.
    pub subject: Option<NormalizedIssue>,
    /// Fields that would change on the subject, with source and target
    /// values; empty for creations.
    pub differences: Vec<FieldDifference>,
}

impl ProposedChange {
    /// Returns the identifier of the issue that would be mutated.
    #[must_use]
    pub fn subject_id(&self) -> Option<&str> {
        self.subject.as_ref().map(|issue| issue.id.as_str())
    }
}

/// Classification of a failure collected during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncErrorKind {
    /// The provider kept rate-limiting after the retry budget was spent.
    RateLimited,
    /// A referenced issue, state or label does not exist upstream.
    NotFound,
    /// The provider rejected the request.
    Rejected,
    /// Network or server failure.
    Transport,
    /// The ledger could not be read or written.
    Ledger,
}

impl SyncErrorKind {
    /// Returns the report name of the error kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::NotFound => "not_found",
            Self::Rejected => "rejected",
            Self::Transport => "transport",
            Self::Ledger => "ledger",
        }
    }
}

/// The unit of work a collected error abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum SyncErrorScope {
    /// Fetching the full issue list of a provider.
    Fetch {
        /// The provider that failed.
        role: ProviderRole,
    },
    /// Processing one issue or issue pair.
    Issue {
        /// The provider owning `issue_id`.
        role: ProviderRole,
        /// The issue being processed.
        issue_id: String,
    },
    /// Persisting the ledger.
    Ledger,
}

impl fmt::Display for SyncErrorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch { role } => write!(f, "fetch from {role}"),
            Self::Issue { role, issue_id } => write!(f, "{role} issue {issue_id}"),
            Self::Ledger => f.write_str("ledger"),
        }
    }
}

/// A failure collected instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncError {
    /// The abandoned unit of work.
    pub scope: SyncErrorScope,
    /// Failure classification.
    pub kind: SyncErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.scope, self.kind.as_str(), self.message)
    }
}

/// Everything a reconciliation run observed and did.
///
/// Callers must inspect both `conflicts` (needs a human decision) and
/// `errors` (the run is incomplete). Only a result with both empty is a fully
/// successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Changes propagated from source into target.
    pub source_to_target_changes: Vec<IssueChange>,
    /// Changes propagated from target into source.
    pub target_to_source_changes: Vec<IssueChange>,
    /// Linked pairs left untouched because both sides diverged.
    pub conflicts: Vec<IssueConflict>,
    /// Failures that abandoned a unit of work.
    pub errors: Vec<SyncError>,
    /// Proposals a reviewer declined.
    pub skipped: Vec<ProposedChange>,
    /// Whether the run only planned changes.
    pub dry_run: bool,
}

impl SyncResult {
    /// Returns `true` when no conflicts and no errors were collected.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.errors.is_empty()
    }

    /// Returns `true` when every unit of work ran to completion.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of propagated changes in both directions.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.source_to_target_changes.len() + self.target_to_source_changes.len()
    }

    /// Returns a count-only summary.
    #[must_use]
    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            source_to_target: self.source_to_target_changes.len(),
            target_to_source: self.target_to_source_changes.len(),
            conflicts: self.conflicts.len(),
            errors: self.errors.len(),
            skipped: self.skipped.len(),
            dry_run: self.dry_run,
        }
    }
}

/// Counts from a [`SyncResult`], for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Changes propagated into the target.
    pub source_to_target: usize,
    /// Changes propagated into the source.
    pub target_to_source: usize,
    /// Conflicts surfaced.
    pub conflicts: usize,
    /// Errors collected.
    pub errors: usize,
    /// Proposals declined by a reviewer.
    pub skipped: usize,
    /// Whether the run only planned changes.
    pub dry_run: bool,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            f.write_str("[dry-run] ")?;
        }
        write!(
            f,
            "{} source->target, {} target->source, {} conflicts, {} errors, {} skipped",
            self.source_to_target, self.target_to_source, self.conflicts, self.errors, self.skipped
        )
    }
}
