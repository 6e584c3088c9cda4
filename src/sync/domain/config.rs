//! Run options consumed by the reconciliation engine.

use super::SyncDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which halves of a reconciliation run may mutate a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SyncDirection {
    /// Only the target receives changes.
    SourceToTarget,
    /// Only the source receives changes.
    TargetToSource,
    /// Both sides receive changes.
    #[default]
    Both,
}

impl SyncDirection {
    /// Returns the canonical configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SourceToTarget => "source-to-target",
            Self::TargetToSource => "target-to-source",
            Self::Both => "both",
        }
    }

    /// Returns `true` when the target may be mutated.
    #[must_use]
    pub const fn allows_source_to_target(self) -> bool {
        matches!(self, Self::SourceToTarget | Self::Both)
    }

    /// Returns `true` when the source may be mutated.
    #[must_use]
    pub const fn allows_target_to_source(self) -> bool {
        matches!(self, Self::TargetToSource | Self::Both)
    }
}

impl TryFrom<&str> for SyncDirection {
    type Error = SyncDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "source-to-target" => Ok(Self::SourceToTarget),
            "target-to-source" => Ok(Self::TargetToSource),
            "both" => Ok(Self::Both),
            _ => Err(SyncDomainError::InvalidDirection(value.to_owned())),
        }
    }
}

impl TryFrom<String> for SyncDirection {
    type Error = SyncDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<SyncDirection> for String {
    fn from(value: SyncDirection) -> Self {
        value.as_str().to_owned()
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options controlling a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SyncOptions {
    /// Which providers may be mutated.
    pub direction: SyncDirection,
    /// Fixed delay before retrying a rate-limited call, in milliseconds.
    pub retry_delay_ms: u64,
    /// Plan and report changes without applying them.
    pub dry_run: bool,
}

impl SyncOptions {
    /// Default delay before retrying a rate-limited call.
    pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

    /// Sets the sync direction.
    #[must_use]
    pub const fn with_direction(mut self, direction: SyncDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the rate-limit retry delay.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enables or disables dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns the rate-limit retry delay.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            direction: SyncDirection::Both,
            retry_delay_ms: Self::DEFAULT_RETRY_DELAY_MS,
            dry_run: false,
        }
    }
}
