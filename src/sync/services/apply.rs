//! Resolution of propagated values against the receiving provider.
//!
//! A change carries the originating side's values; before it reaches the
//! receiving provider, state names and labels are translated into names that
//! provider actually has.

use crate::sync::{
    domain::{
        NormalizedLabel, NormalizedState, ProviderRole, StateCategory, StateMappingConfig,
        SyncError, SyncErrorKind, SyncErrorScope,
    },
    ports::{LedgerError, ProviderError},
};
use thiserror::Error;

/// Failure of one unit of work inside a run.
#[derive(Debug, Clone, Error)]
pub(crate) enum UnitError {
    /// A provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The ledger could not be read or written; fatal for the run.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The receiving provider has no state in the required category.
    #[error("{provider} has no state in category {category}")]
    StateUnavailable {
        provider: String,
        category: StateCategory,
    },

    /// A ledger link exists but its target issue is gone.
    #[error("target issue {target_id} linked to this source no longer exists")]
    LinkedTargetMissing { target_id: String },
}

impl UnitError {
    /// Returns `true` when the run cannot continue.
    pub(crate) const fn is_fatal(&self) -> bool {
        matches!(self, Self::Ledger(_))
    }

    /// Classifies the failure for the run report.
    pub(crate) fn into_sync_error(self, scope: SyncErrorScope) -> SyncError {
        let kind = match &self {
            Self::Provider(ProviderError::RateLimited { .. }) => SyncErrorKind::RateLimited,
            Self::Provider(ProviderError::NotFound { .. })
            | Self::StateUnavailable { .. }
            | Self::LinkedTargetMissing { .. } => SyncErrorKind::NotFound,
            Self::Provider(ProviderError::Rejected { .. }) => SyncErrorKind::Rejected,
            Self::Provider(ProviderError::Transport(_)) => SyncErrorKind::Transport,
            Self::Ledger(_) => SyncErrorKind::Ledger,
        };
        SyncError {
            scope,
            kind,
            message: self.to_string(),
        }
    }
}

/// Builds the scope for an error while processing a single issue.
pub(crate) fn issue_scope(role: ProviderRole, issue_id: &str) -> SyncErrorScope {
    SyncErrorScope::Issue {
        role,
        issue_id: issue_id.to_owned(),
    }
}

/// Picks the receiving-side state for a desired category.
///
/// A current state already in the desired category is kept as is, even when
/// the origin uses a different name for it; otherwise a catalog state with
/// the origin's name wins over the first catalog state in the category.
/// Returns `None` when the catalog has no state in the category.
pub(crate) fn resolve_state(
    current: Option<&NormalizedState>,
    desired: &NormalizedState,
    catalog: &[NormalizedState],
    mapping: &StateMappingConfig,
) -> Option<NormalizedState> {
    if let Some(state) = current.filter(|state| state.category == desired.category) {
        return Some(state.clone());
    }

    let mut candidates = catalog
        .iter()
        .filter(|state| mapping.category_of(&state.name) == desired.category)
        .peekable();
    let first = candidates.peek().copied();
    let chosen = candidates
        .find(|state| state.name.trim().eq_ignore_ascii_case(desired.name.trim()))
        .or(first)?;
    Some(NormalizedState {
        category: desired.category,
        ..chosen.clone()
    })
}

/// Translates labels into the receiving provider's vocabulary.
///
/// Labels already attached to the receiving issue are kept verbatim, then
/// catalog labels are preferred, and unknown labels are passed through
/// without their foreign provider identifier.
pub(crate) fn resolve_labels(
    desired: &[NormalizedLabel],
    current: &[NormalizedLabel],
    catalog: &[NormalizedLabel],
) -> Vec<NormalizedLabel> {
    desired
        .iter()
        .map(|label| {
            current
                .iter()
                .chain(catalog)
                .find(|candidate| candidate.same_label(label))
                .cloned()
                .unwrap_or_else(|| NormalizedLabel {
                    provider_id: None,
                    ..label.clone()
                })
        })
        .collect()
}

/// Returns `labels` with `marker` appended unless already present.
pub(crate) fn with_marker_label(labels: &[NormalizedLabel], marker: &str) -> Vec<NormalizedLabel> {
    let probe = NormalizedLabel::new(marker);
    let mut marked = labels.to_vec();
    if !marked.iter().any(|label| label.same_label(&probe)) {
        marked.push(probe);
    }
    marked
}
