//! Shared world state for reconciliation BDD scenarios.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeZone, Utc};
use mockable::DefaultClock;
use rstest::fixture;
use tracksync::sync::{
    adapters::memory::{InMemoryLedger, InMemoryProvider},
    domain::{
        NormalizedIssue, NormalizedState, StateCategory, StateMappingConfig, SyncOptions,
        SyncResult,
    },
    services::ReconciliationEngine,
};

/// Engine type used by the BDD world.
pub type TestEngine =
    ReconciliationEngine<InMemoryProvider, InMemoryProvider, InMemoryLedger, DefaultClock>;

/// Scenario world for reconciliation behaviour tests.
pub struct ReconciliationWorld {
    pub source: Arc<InMemoryProvider>,
    pub target: Arc<InMemoryProvider>,
    pub ledger: Arc<InMemoryLedger>,
    pub last_result: Option<SyncResult>,
}

impl ReconciliationWorld {
    /// Creates a world with two empty trackers and an empty ledger.
    ///
    /// # Panics
    ///
    /// Panics if the fixed state mappings are invalid.
    #[must_use]
    pub fn new() -> Self {
        let source_mapping = StateMappingConfig::new(
            [
                ("Backlog", StateCategory::Backlog),
                ("Todo", StateCategory::Todo),
                ("Done", StateCategory::Done),
            ],
            StateCategory::Backlog,
        )
        .expect("source mapping is valid");
        let target_mapping = StateMappingConfig::new(
            [
                ("triage", StateCategory::Backlog),
                ("open", StateCategory::Todo),
                ("closed", StateCategory::Done),
            ],
            StateCategory::Backlog,
        )
        .expect("target mapping is valid");

        Self {
            source: Arc::new(
                InMemoryProvider::new("source", source_mapping, Arc::new(DefaultClock))
                    .with_states(["Backlog", "Todo", "Done"]),
            ),
            target: Arc::new(
                InMemoryProvider::new("target", target_mapping, Arc::new(DefaultClock))
                    .with_states(["triage", "open", "closed"]),
            ),
            ledger: Arc::new(InMemoryLedger::new()),
            last_result: None,
        }
    }

    /// Builds an engine over the world's trackers and ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects its configuration.
    pub fn engine(&self, dry_run: bool) -> Result<TestEngine, eyre::Report> {
        let options = SyncOptions::default()
            .with_retry_delay(Duration::ZERO)
            .with_dry_run(dry_run);
        ReconciliationEngine::new(
            Arc::clone(&self.source),
            Arc::clone(&self.target),
            Arc::clone(&self.ledger),
            Arc::new(DefaultClock),
            options,
        )
        .map_err(|err| eyre::eyre!("engine rejected configuration: {err}"))
    }

    /// Returns the result of the last reconciliation.
    ///
    /// # Errors
    ///
    /// Returns an error if no run has happened yet.
    pub fn result(&self) -> Result<&SyncResult, eyre::Report> {
        self.last_result
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no reconciliation run in scenario world"))
    }
}

impl Default for ReconciliationWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ReconciliationWorld {
    ReconciliationWorld::default()
}

/// Timestamp shared by every seeded issue.
///
/// # Panics
///
/// Panics if the fixed date is invalid.
#[must_use]
pub fn seeded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0)
        .single()
        .expect("seed timestamp is valid")
}

/// Builds an issue in a named state stamped at [`seeded_at`].
#[must_use]
pub fn seeded_issue(id: &str, title: &str, state: &str, provider: &str) -> NormalizedIssue {
    NormalizedIssue::new(
        id,
        title,
        NormalizedState::new(StateCategory::Backlog, state),
        provider,
        seeded_at(),
    )
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
