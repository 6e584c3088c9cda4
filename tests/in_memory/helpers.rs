//! Shared test helpers for in-memory reconciliation integration tests.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use mockable::DefaultClock;
use rstest::fixture;
use tracksync::sync::{
    adapters::memory::{InMemoryLedger, InMemoryProvider},
    domain::{
        NormalizedIssue, NormalizedState, StateCategory, StateMappingConfig,
        SyncOptions,
    },
    ports::SyncLedger,
    services::ReconciliationEngine,
};

/// Engine over two in-memory trackers and any ledger.
pub type TestEngine<L> = ReconciliationEngine<InMemoryProvider, InMemoryProvider, L, DefaultClock>;

/// The two trackers kept in sync by a test.
pub struct Trackers {
    /// Canonical tracker.
    pub source: Arc<InMemoryProvider>,
    /// Downstream tracker.
    pub target: Arc<InMemoryProvider>,
}

impl Trackers {
    /// Builds an engine over both trackers and `ledger`.
    ///
    /// # Panics
    ///
    /// Panics if the tracker names collide.
    #[must_use]
    pub fn engine<L: SyncLedger>(&self, ledger: Arc<L>, options: SyncOptions) -> TestEngine<L> {
        ReconciliationEngine::new(
            Arc::clone(&self.source),
            Arc::clone(&self.target),
            ledger,
            Arc::new(DefaultClock),
            options,
        )
        .expect("tracker names are distinct")
    }

    /// Edits a source issue as a user would, stamping it after `after`.
    ///
    /// # Panics
    ///
    /// Panics if the issue does not exist.
    pub fn edit_source(
        &self,
        id: &str,
        after: DateTime<Utc>,
        edit: impl FnOnce(&mut NormalizedIssue),
    ) {
        let mut issue = self.source.issue(id).expect("source issue exists");
        edit(&mut issue);
        issue.updated_at = after + ChronoDuration::minutes(1);
        self.source.insert_issue(issue);
    }

    /// Edits a target issue as a user would, stamping it after `after`.
    ///
    /// # Panics
    ///
    /// Panics if the issue does not exist.
    pub fn edit_target(
        &self,
        id: &str,
        after: DateTime<Utc>,
        edit: impl FnOnce(&mut NormalizedIssue),
    ) {
        let mut issue = self.target.issue(id).expect("target issue exists");
        edit(&mut issue);
        issue.updated_at = after + ChronoDuration::minutes(1);
        self.target.insert_issue(issue);
    }

    /// Returns the target issue linked to `source_id`.
    #[must_use]
    pub fn target_for(&self, source_id: &str) -> Option<NormalizedIssue> {
        self.target.issues().into_iter().find(|issue| {
            issue
                .link()
                .is_some_and(|link| link.external_id == source_id)
        })
    }
}

/// Provides two four-state trackers that name their states differently.
#[fixture]
pub fn trackers() -> Trackers {
    let source_mapping = StateMappingConfig::new(
        [
            ("Backlog", StateCategory::Backlog),
            ("Todo", StateCategory::Todo),
            ("In Progress", StateCategory::InProgress),
            ("Done", StateCategory::Done),
        ],
        StateCategory::Backlog,
    )
    .expect("source mapping is valid");
    let source = InMemoryProvider::new("linear", source_mapping, Arc::new(DefaultClock))
        .with_states(["Backlog", "Todo", "In Progress", "Done"]);
    let target_mapping = StateMappingConfig::new(
        [
            ("triage", StateCategory::Backlog),
            ("open", StateCategory::Todo),
            ("doing", StateCategory::InProgress),
            ("closed", StateCategory::Done),
        ],
        StateCategory::Backlog,
    )
    .expect("target mapping is valid");
    let target = InMemoryProvider::new("github", target_mapping, Arc::new(DefaultClock))
        .with_states(["triage", "open", "doing", "closed"]);
    Trackers {
        source: Arc::new(source),
        target: Arc::new(target),
    }
}

/// Provides a fresh in-memory ledger for each test.
#[fixture]
pub fn ledger() -> Arc<InMemoryLedger> {
    Arc::new(InMemoryLedger::new())
}

/// Run options without retry back-off.
#[must_use]
pub fn options() -> SyncOptions {
    SyncOptions::default().with_retry_delay(Duration::ZERO)
}

/// A fixed point well before any engine-stamped time.
///
/// # Panics
///
/// Panics if the fixed date is invalid.
#[must_use]
pub fn seeded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0)
        .single()
        .expect("seed timestamp is valid")
}

/// Builds an issue seeded at [`seeded_at`].
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

