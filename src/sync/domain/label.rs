//! Provider-agnostic labels.

use serde::{Deserialize, Serialize};

/// A label as seen through the canonical model.
///
/// Labels have no cross-provider identifier; two labels are the same label
/// when their [`key`](Self::key) matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedLabel {
    /// Display name.
    pub name: String,
    /// Provider display colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Provider description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Provider-local label identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl NormalizedLabel {
    /// Creates a label with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
            description: None,
            provider_id: None,
        }
    }

    /// Sets the display colour.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the identity key: the trimmed, lowercased name.
    #[must_use]
    pub fn key(&self) -> String {
        normalize_key(&self.name)
    }

    /// Returns `true` when both labels share an identity key.
    #[must_use]
    pub fn same_label(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

/// Normalizes a label name or assignee identifier for set comparison.
#[must_use]
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}
