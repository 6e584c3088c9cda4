//! Deterministic summaries of an issue's mutable fields.

use super::{NormalizedIssue, StateCategory, normalize_key};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// The mutable, synchronised fields of an issue in comparison form.
///
/// Label names and assignees are normalized and sorted so that two issues
/// with equivalent sets produce the same content regardless of order or case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueContent {
    /// Issue title.
    pub title: String,
    /// Issue body.
    pub description: String,
    /// State category.
    pub state: StateCategory,
    /// Sorted, lowercased label names.
    pub labels: Vec<String>,
    /// Sorted, lowercased assignee identifiers.
    pub assignees: Vec<String>,
}

impl IssueContent {
    /// Extracts the comparison form of an issue.
    #[must_use]
    pub fn of(issue: &NormalizedIssue) -> Self {
        Self {
            title: issue.title.clone(),
            description: issue.description.clone(),
            state: issue.state.category,
            labels: normalized_set(issue.labels.iter().map(|label| label.name.as_str())),
            assignees: normalized_set(issue.assignees.iter().map(String::as_str)),
        }
    }

    /// Computes the fingerprint of this content.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        hash_field(&mut hasher, &self.title);
        hash_field(&mut hasher, &self.description);
        hash_field(&mut hasher, self.state.as_str());
        for set in [&self.labels, &self.assignees] {
            hasher.update(format!("{}#", set.len()).as_bytes());
            for value in set {
                hash_field(&mut hasher, value);
            }
        }
        Fingerprint::from_digest(&hasher.finalize())
    }
}

/// Hex-encoded SHA-256 digest of an [`IssueContent`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprints the mutable fields of an issue.
    #[must_use]
    pub fn of(issue: &NormalizedIssue) -> Self {
        IssueContent::of(issue).fingerprint()
    }

    /// Wraps a previously persisted fingerprint.
    #[must_use]
    pub fn from_persisted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_digest(digest: &[u8]) -> Self {
        Self(digest.iter().map(|byte| format!("{byte:02x}")).collect())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Length-prefixed so adjacent fields cannot run into each other.
fn hash_field(hasher: &mut Sha256, value: &str) {
    hasher.update(value.len().to_string().as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
}

/// Normalizes and sorts a collection of names.
#[must_use]
pub fn normalized_set<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut set: Vec<String> = values.into_iter().map(normalize_key).collect();
    set.sort_unstable();
    set
}
