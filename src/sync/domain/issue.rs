//! The canonical, provider-agnostic issue representation.

use super::{NormalizedLabel, NormalizedState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link metadata pointing at the paired record in the other system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueLink {
    /// Identifier of the paired issue in the other provider.
    pub external_id: String,
    /// Name of the provider owning `external_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl IssueLink {
    /// Creates a link to an issue in the named provider.
    #[must_use]
    pub fn new(external_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            provider: Some(provider.into()),
        }
    }

    /// Returns `true` when this link references `issue_id` in `provider`.
    ///
    /// A link without a recorded provider matches on identifier alone.
    #[must_use]
    pub fn points_to(&self, issue_id: &str, provider: &str) -> bool {
        self.external_id == issue_id && self.provider.as_deref().is_none_or(|p| p == provider)
    }
}

/// Known metadata carried by a normalized issue.
///
/// Anything provider-specific beyond these keys stays inside the adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueMetadata {
    /// Link to the paired issue; absent until the issue is linked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<IssueLink>,
    /// Browser URL of the issue in its own provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Human-facing issue number, when the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    /// Parent issue identifier for derived (sub-)items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// An issue folded into the canonical model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedIssue {
    /// Provider-local identifier.
    pub id: String,
    /// Issue title.
    pub title: String,
    /// Issue body; empty when the provider has none.
    #[serde(default)]
    pub description: String,
    /// Canonical state.
    pub state: NormalizedState,
    /// Attached labels.
    #[serde(default)]
    pub labels: Vec<NormalizedLabel>,
    /// Provider-local assignee identifiers.
    #[serde(default)]
    pub assignees: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Name of the provider the issue was fetched from.
    pub source_provider: String,
    /// Link and provider extras.
    #[serde(default)]
    pub metadata: IssueMetadata,
}

impl NormalizedIssue {
    /// Creates an unlinked issue with no labels or assignees.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        state: NormalizedState,
        source_provider: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            state,
            labels: Vec::new(),
            assignees: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
            source_provider: source_provider.into(),
            metadata: IssueMetadata::default(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the labels from display names.
    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(NormalizedLabel::new).collect();
        self
    }

    /// Sets the assignee identifiers.
    #[must_use]
    pub fn with_assignees<I, S>(mut self, assignees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assignees = assignees.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the link metadata.
    #[must_use]
    pub fn with_link(mut self, link: IssueLink) -> Self {
        self.metadata.link = Some(link);
        self
    }

    /// Sets the latest modification timestamp.
    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Returns the link metadata, if the issue is linked.
    #[must_use]
    pub const fn link(&self) -> Option<&IssueLink> {
        self.metadata.link.as_ref()
    }

    /// Returns `true` when the issue is a derived (sub-)item.
    #[must_use]
    pub const fn is_derived_item(&self) -> bool {
        self.metadata.parent_id.is_some()
    }

    /// Returns `true` when a label with the same identity key is attached.
    #[must_use]
    pub fn has_label(&self, name: &str) -> bool {
        let probe = NormalizedLabel::new(name);
        self.labels.iter().any(|label| label.same_label(&probe))
    }

    /// Returns `true` when title and description are identical.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.title == other.title && self.description == other.description
    }

    /// Applies a partial update in place.
    pub fn apply_patch(&mut self, patch: &IssuePatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(state) = &patch.state {
            self.state = state.clone();
        }
        if let Some(labels) = &patch.labels {
            self.labels.clone_from(labels);
        }
        if let Some(assignees) = &patch.assignees {
            self.assignees.clone_from(assignees);
        }
        if let Some(link) = &patch.link {
            self.metadata.link = Some(link.clone());
        }
    }
}

/// Payload for creating an issue: a [`NormalizedIssue`] without identity,
/// timestamps or owning provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    /// Issue title.
    pub title: String,
    /// Issue body.
    pub description: String,
    /// Initial state, resolved against the receiving provider.
    pub state: NormalizedState,
    /// Initial labels.
    pub labels: Vec<NormalizedLabel>,
    /// Initial assignee identifiers.
    pub assignees: Vec<String>,
    /// Link and provider extras.
    pub metadata: IssueMetadata,
}

impl NewIssue {
    /// Materialises the payload as an issue owned by `provider`.
    #[must_use]
    pub fn into_issue(
        self,
        id: impl Into<String>,
        provider: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> NormalizedIssue {
        NormalizedIssue {
            id: id.into(),
            title: self.title,
            description: self.description,
            state: self.state,
            labels: self.labels,
            assignees: self.assignees,
            created_at: timestamp,
            updated_at: timestamp,
            source_provider: provider.into(),
            metadata: self.metadata,
        }
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuePatch {
    /// Replacement title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Replacement description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<NormalizedState>,
    /// Replacement label set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<NormalizedLabel>>,
    /// Replacement assignee set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    /// Link metadata to record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<IssueLink>,
}

impl IssuePatch {
    /// Returns `true` when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.state.is_none()
            && self.labels.is_none()
            && self.assignees.is_none()
            && self.link.is_none()
    }
}
