//! Canonical state categories and per-provider state folding.

use super::SyncDomainError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One of the five canonical buckets every provider state folds into.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StateCategory {
    /// Captured but not yet planned.
    #[default]
    Backlog,
    /// Planned and ready to be picked up.
    Todo,
    /// Actively being worked on.
    InProgress,
    /// Work finished and awaiting release or review.
    Ready,
    /// Closed, either completed or cancelled.
    Done,
}

impl StateCategory {
    /// All categories in workflow order.
    pub const ALL: [Self; 5] = [
        Self::Backlog,
        Self::Todo,
        Self::InProgress,
        Self::Ready,
        Self::Done,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Ready => "ready",
            Self::Done => "done",
        }
    }
}

impl TryFrom<&str> for StateCategory {
    type Error = SyncDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "backlog" => Ok(Self::Backlog),
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "ready" => Ok(Self::Ready),
            "done" => Ok(Self::Done),
            _ => Err(SyncDomainError::InvalidCategory(value.to_owned())),
        }
    }
}

impl fmt::Display for StateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider state folded into a canonical category.
///
/// `name` and `color` are display-only; reconciliation logic only ever looks
/// at `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedState {
    /// Canonical category.
    pub category: StateCategory,
    /// Original provider state name.
    pub name: String,
    /// Provider display colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Provider-local state identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl NormalizedState {
    /// Creates a state with the given category and display name.
    #[must_use]
    pub fn new(category: StateCategory, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
            color: None,
            provider_id: None,
        }
    }

    /// Sets the display colour.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Sets the provider-local state identifier.
    #[must_use]
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }
}

/// Per-provider table folding native state names into categories.
///
/// Built once per provider and immutable afterwards. Lookups are
/// case-insensitive; unknown names fall back to `default_category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMappingConfig {
    state_mapping: HashMap<String, StateCategory>,
    default_category: StateCategory,
}

impl StateMappingConfig {
    /// Creates a mapping table from provider state names.
    ///
    /// # Errors
    ///
    /// Returns [`SyncDomainError::EmptyStateName`] when a key is blank.
    pub fn new<I, S>(mapping: I, default_category: StateCategory) -> Result<Self, SyncDomainError>
    where
        I: IntoIterator<Item = (S, StateCategory)>,
        S: AsRef<str>,
    {
        let mut state_mapping = HashMap::new();
        for (name, category) in mapping {
            let key = normalize_state_name(name.as_ref());
            if key.is_empty() {
                return Err(SyncDomainError::EmptyStateName);
            }
            state_mapping.insert(key, category);
        }
        Ok(Self {
            state_mapping,
            default_category,
        })
    }

    /// Mapping for a binary open/closed tracker.
    #[must_use]
    pub fn open_closed() -> Self {
        let state_mapping = HashMap::from([
            ("open".to_owned(), StateCategory::Todo),
            ("closed".to_owned(), StateCategory::Done),
        ]);
        Self {
            state_mapping,
            default_category: StateCategory::Backlog,
        }
    }

    /// Folds a provider state name into its category.
    ///
    /// Never fails: names missing from the table degrade to the default
    /// category so an unmapped state only under-classifies an issue.
    #[must_use]
    pub fn category_of(&self, name: &str) -> StateCategory {
        self.state_mapping
            .get(&normalize_state_name(name))
            .copied()
            .unwrap_or(self.default_category)
    }

    /// Builds a [`NormalizedState`] for a provider state name.
    #[must_use]
    pub fn normalize(&self, name: &str) -> NormalizedState {
        NormalizedState::new(self.category_of(name), name)
    }

    /// Returns the fallback category.
    #[must_use]
    pub const fn default_category(&self) -> StateCategory {
        self.default_category
    }

    /// Returns the number of mapped state names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state_mapping.len()
    }

    /// Returns `true` when no state name is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state_mapping.is_empty()
    }
}

impl Default for StateMappingConfig {
    fn default() -> Self {
        Self {
            state_mapping: HashMap::new(),
            default_category: StateCategory::Backlog,
        }
    }
}

/// Folds a provider state name through a mapping table.
#[must_use]
pub fn category_of(name: &str, config: &StateMappingConfig) -> StateCategory {
    config.category_of(name)
}

fn normalize_state_name(name: &str) -> String {
    name.trim().to_lowercase()
}
