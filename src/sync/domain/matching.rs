//! Cross-system pairing of source and target issues.

use super::NormalizedIssue;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Classification of a source issue against the target set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PairStatus {
    /// No target counterpart exists; the issue must be created in the target.
    New,
    /// An unlinked target has identical title and description; it must be
    /// linked and brought up to date.
    LinkedNeedsBackfill,
    /// Linked, and the source was modified more recently.
    SourceAhead,
    /// Linked, and the target was modified more recently.
    TargetAhead,
    /// Linked, and both sides carry the same modification timestamp.
    Tied,
}

impl PairStatus {
    /// Returns the report name of the classification.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::LinkedNeedsBackfill => "linked-needs-backfill",
            Self::SourceAhead => "source-ahead",
            Self::TargetAhead => "target-ahead",
            Self::Tied => "tied",
        }
    }

    /// Classifies a linked pair by modification timestamps.
    #[must_use]
    pub fn for_linked(source: &NormalizedIssue, target: &NormalizedIssue) -> Self {
        match source.updated_at.cmp(&target.updated_at) {
            std::cmp::Ordering::Greater => Self::SourceAhead,
            std::cmp::Ordering::Less => Self::TargetAhead,
            std::cmp::Ordering::Equal => Self::Tied,
        }
    }
}

impl fmt::Display for PairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source issue together with its target counterpart, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuePair<'a> {
    /// The source issue.
    pub source: &'a NormalizedIssue,
    /// The paired target issue; `None` only for [`PairStatus::New`].
    pub target: Option<&'a NormalizedIssue>,
    /// How the pair relates.
    pub status: PairStatus,
}

/// A content match where more than one unlinked target qualified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousMatch {
    /// The source issue being matched.
    pub source_id: String,
    /// Every qualifying target, in fetch order; the first was chosen.
    pub candidate_ids: Vec<String>,
}

/// Result of matching a source issue set against a target issue set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport<'a> {
    /// One entry per source issue, in source order.
    pub pairs: Vec<IssuePair<'a>>,
    /// Targets linked to a source id that no longer exists, in target order.
    pub orphaned_targets: Vec<&'a NormalizedIssue>,
    /// Targets left untouched: unlinked with no content match, linked to a
    /// different provider, or a second link to an already paired source.
    pub unmatched_targets: Vec<&'a NormalizedIssue>,
    /// Content matches that had more than one candidate.
    pub ambiguous: Vec<AmbiguousMatch>,
}

/// Pairs every source issue with at most one target issue.
///
/// Link metadata wins over content. A target whose link names
/// `source_provider` (or names no provider) and whose external id equals a
/// source id is paired with that source. Unlinked sources then claim the
/// first unclaimed, unlinked target with identical title and description;
/// a target is claimed at most once. Linked targets whose source is gone are
/// reported as orphans.
#[must_use]
pub fn match_issues<'a>(
    sources: &'a [NormalizedIssue],
    targets: &'a [NormalizedIssue],
    source_provider: &str,
) -> MatchReport<'a> {
    let source_ids: HashSet<&str> = sources.iter().map(|issue| issue.id.as_str()).collect();
    let mut linked_by_source: HashMap<&str, usize> = HashMap::new();
    let mut report = MatchReport::default();

    for (index, target) in targets.iter().enumerate() {
        let Some(link) = target.link() else {
            continue;
        };
        if link.provider.as_deref().is_some_and(|p| p != source_provider) {
            report.unmatched_targets.push(target);
            continue;
        }
        if !source_ids.contains(link.external_id.as_str()) {
            report.orphaned_targets.push(target);
            continue;
        }
        if linked_by_source.contains_key(link.external_id.as_str()) {
            report.unmatched_targets.push(target);
            continue;
        }
        linked_by_source.insert(link.external_id.as_str(), index);
    }

    let mut claimed: HashSet<usize> = linked_by_source.values().copied().collect();
    for source in sources {
        if let Some(target) = linked_by_source
            .get(source.id.as_str())
            .and_then(|index| targets.get(*index))
        {
            report.pairs.push(IssuePair {
                source,
                target: Some(target),
                status: PairStatus::for_linked(source, target),
            });
            continue;
        }

        let candidates: Vec<usize> = targets
            .iter()
            .enumerate()
            .filter(|(index, target)| {
                target.link().is_none() && !claimed.contains(index) && target.same_content(source)
            })
            .map(|(index, _)| index)
            .collect();
        if candidates.len() > 1 {
            report.ambiguous.push(AmbiguousMatch {
                source_id: source.id.clone(),
                candidate_ids: candidates
                    .iter()
                    .filter_map(|index| targets.get(*index))
                    .map(|target| target.id.clone())
                    .collect(),
            });
        }

        let content_match = candidates
            .first()
            .and_then(|index| targets.get(*index).map(|target| (*index, target)));
        if let Some((index, target)) = content_match {
            claimed.insert(index);
            report.pairs.push(IssuePair {
                source,
                target: Some(target),
                status: PairStatus::LinkedNeedsBackfill,
            });
        } else {
            report.pairs.push(IssuePair {
                source,
                target: None,
                status: PairStatus::New,
            });
        }
    }

    report.unmatched_targets.extend(
        targets
            .iter()
            .enumerate()
            .filter(|(index, target)| target.link().is_none() && !claimed.contains(index))
            .map(|(_, target)| target),
    );
    report
}
