//! Field-level comparison of two issues.
//!
//! The same diff drives three decisions: whether a linked pair needs any
//! propagation at all, which fields go into an update patch, and which fields
//! are reported when two sides were edited concurrently.

use super::{NormalizedIssue, NormalizedState, fingerprint::normalized_set};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A synchronised issue field, in comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueField {
    /// Issue title, compared exactly.
    Title,
    /// Issue body, compared exactly.
    Description,
    /// State, compared by category.
    State,
    /// Labels, compared as a case-insensitive set of names.
    Labels,
    /// Assignees, compared as a case-insensitive set of identifiers.
    Assignees,
}

impl IssueField {
    /// Fields in the order they are compared and reported.
    pub const ALL: [Self; 5] = [
        Self::Title,
        Self::Description,
        Self::State,
        Self::Labels,
        Self::Assignees,
    ];

    /// Returns the report name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::State => "state",
            Self::Labels => "labels",
            Self::Assignees => "assignees",
        }
    }
}

impl fmt::Display for IssueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw value of a field, kept for human review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Title or description text.
    Text(String),
    /// Full state including the provider display name.
    State(NormalizedState),
    /// Label names or assignee identifiers as the provider reported them.
    Names(Vec<String>),
}

impl FieldValue {
    /// Reads the raw value of `field` from an issue.
    #[must_use]
    pub fn of(issue: &NormalizedIssue, field: IssueField) -> Self {
        match field {
            IssueField::Title => Self::Text(issue.title.clone()),
            IssueField::Description => Self::Text(issue.description.clone()),
            IssueField::State => Self::State(issue.state.clone()),
            IssueField::Labels => {
                Self::Names(issue.labels.iter().map(|label| label.name.clone()).collect())
            }
            IssueField::Assignees => Self::Names(issue.assignees.clone()),
        }
    }
}

/// One field whose values disagree between source and target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDifference {
    /// The differing field.
    pub field: IssueField,
    /// Raw value on the source side.
    pub source_value: FieldValue,
    /// Raw value on the target side.
    pub target_value: FieldValue,
}

/// Returns `true` when `field` holds equivalent values on both issues.
#[must_use]
pub fn field_matches(a: &NormalizedIssue, b: &NormalizedIssue, field: IssueField) -> bool {
    match field {
        IssueField::Title => a.title == b.title,
        IssueField::Description => a.description == b.description,
        IssueField::State => a.state.category == b.state.category,
        IssueField::Labels => same_name_set(
            a.labels.iter().map(|label| label.name.as_str()),
            b.labels.iter().map(|label| label.name.as_str()),
        ),
        IssueField::Assignees => same_name_set(
            a.assignees.iter().map(String::as_str),
            b.assignees.iter().map(String::as_str),
        ),
    }
}

/// Compares `source` and `target` field by field.
///
/// Returns one [`FieldDifference`] per differing field, in
/// [`IssueField::ALL`] order. An empty result means the pair is in sync.
#[must_use]
pub fn diff(source: &NormalizedIssue, target: &NormalizedIssue) -> Vec<FieldDifference> {
    IssueField::ALL
        .into_iter()
        .filter(|field| !field_matches(source, target, *field))
        .map(|field| FieldDifference {
            field,
            source_value: FieldValue::of(source, field),
            target_value: FieldValue::of(target, field),
        })
        .collect()
}

/// Returns the fields that differ, without their values.
#[must_use]
pub fn differing_fields(a: &NormalizedIssue, b: &NormalizedIssue) -> Vec<IssueField> {
    IssueField::ALL
        .into_iter()
        .filter(|field| !field_matches(a, b, *field))
        .collect()
}

// Equivalent iff both sides have the same cardinality and every normalized
// member of each side exists on the other.
fn same_name_set<'a>(
    left: impl IntoIterator<Item = &'a str>,
    right: impl IntoIterator<Item = &'a str>,
) -> bool {
    let left_names = normalized_set(left);
    let right_names = normalized_set(right);
    left_names.len() == right_names.len()
        && left_names.iter().all(|name| right_names.contains(name))
        && right_names.iter().all(|name| left_names.contains(name))
}
