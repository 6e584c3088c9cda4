//! Multi-run reconciliation workflows over in-memory trackers.

use std::sync::Arc;

use rstest::rstest;
use tracksync::sync::{
    adapters::memory::{InMemoryLedger, ProviderOperation},
    domain::{CANCELLED_LABEL, ChangeKind, NormalizedState, StateCategory, SyncDirection},
    ports::SyncLedger,
};

use super::helpers::{Trackers, ledger, options, seeded_issue, trackers};

fn kinds(changes: &[tracksync::sync::domain::IssueChange]) -> Vec<ChangeKind> {
    changes.iter().map(|change| change.kind).collect()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn issue_lifecycle_is_mirrored_across_runs(
    trackers: Trackers,
    ledger: Arc<InMemoryLedger>,
) -> eyre::Result<()> {
    trackers
        .source
        .insert_issue(seeded_issue("LIN-1", "Ship login", "Todo", "linear"));
    trackers.source.insert_issue(
        seeded_issue("LIN-2", "Write docs", "Backlog", "linear").with_labels(["docs"]),
    );
    let engine = trackers.engine(Arc::clone(&ledger), options());

    let created = engine.sync().await;
    assert!(created.is_clean(), "unexpected result: {created:?}");
    assert_eq!(
        kinds(&created.source_to_target_changes),
        vec![ChangeKind::Create, ChangeKind::Create]
    );
    let mirrored = trackers.target_for("LIN-1").expect("LIN-1 mirrored");
    assert_eq!(mirrored.state.name, "open");

    trackers.edit_source("LIN-1", mirrored.updated_at, |issue| {
        issue.title = "Ship login v2".to_owned();
        issue.state = NormalizedState::new(StateCategory::InProgress, "In Progress");
    });
    let updated = engine.sync().await;
    assert_eq!(
        kinds(&updated.source_to_target_changes),
        vec![ChangeKind::Update]
    );
    let mirrored = trackers.target_for("LIN-1").expect("LIN-1 mirrored");
    assert_eq!(mirrored.title, "Ship login v2");
    assert_eq!(mirrored.state.name, "doing");

    trackers.source.remove_issue("LIN-2");
    let cancelled = engine.sync().await;
    assert_eq!(
        kinds(&cancelled.source_to_target_changes),
        vec![ChangeKind::Cancel]
    );
    let orphan = trackers.target_for("LIN-2").expect("LIN-2 target kept");
    assert_eq!(orphan.state.category, StateCategory::Done);
    assert!(orphan.has_label(CANCELLED_LABEL));
    assert!(orphan.has_label("docs"));
    assert_eq!(ledger.entries().await?.len(), 2);

    let settled = engine.sync().await;
    assert_eq!(settled.change_count(), 0);
    assert!(settled.is_clean());
    assert_eq!(trackers.target.call_count(ProviderOperation::CreateIssue), 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn downstream_edits_flow_back_to_source(
    trackers: Trackers,
    ledger: Arc<InMemoryLedger>,
) -> eyre::Result<()> {
    trackers
        .source
        .insert_issue(seeded_issue("LIN-1", "Ship login", "Todo", "linear"));
    let engine = trackers.engine(Arc::clone(&ledger), options());
    engine.sync().await;
    let mirrored = trackers.target_for("LIN-1").expect("LIN-1 mirrored");

    trackers.edit_target(&mirrored.id, mirrored.updated_at, |issue| {
        issue.assignees = vec!["octocat".to_owned()];
    });
    let result = engine.sync().await;

    assert_eq!(
        kinds(&result.target_to_source_changes),
        vec![ChangeKind::Update]
    );
    let source = trackers.source.issue("LIN-1").expect("source kept");
    assert_eq!(source.assignees, vec!["octocat"]);
    assert_eq!(engine.sync().await.change_count(), 0);
    assert!(ledger.last_sync_timestamp().await?.is_some());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_way_sync_reports_downstream_edits_as_conflicts(
    trackers: Trackers,
    ledger: Arc<InMemoryLedger>,
) {
    trackers
        .source
        .insert_issue(seeded_issue("LIN-1", "Ship login", "Todo", "linear"));
    let engine = trackers.engine(
        ledger,
        options().with_direction(SyncDirection::SourceToTarget),
    );
    engine.sync().await;
    let mirrored = trackers.target_for("LIN-1").expect("LIN-1 mirrored");

    trackers.edit_target(&mirrored.id, mirrored.updated_at, |issue| {
        issue.title = "Ship login (hotfix)".to_owned();
    });
    let result = engine.sync().await;

    assert_eq!(result.conflicts.len(), 1);
    assert_eq!(
        trackers.source.issue("LIN-1").map(|issue| issue.title),
        Some("Ship login".to_owned())
    );
    assert_eq!(trackers.source.call_count(ProviderOperation::UpdateIssue), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dry_run_previews_what_a_real_run_applies(
    trackers: Trackers,
    ledger: Arc<InMemoryLedger>,
) {
    trackers
        .source
        .insert_issue(seeded_issue("LIN-1", "Ship login", "Todo", "linear"));
    trackers
        .source
        .insert_issue(seeded_issue("LIN-2", "Write docs", "Backlog", "linear"));

    let preview = trackers
        .engine(Arc::clone(&ledger), options().with_dry_run(true))
        .sync()
        .await;
    assert!(trackers.target.issues().is_empty());

    let applied = trackers.engine(ledger, options()).sync().await;

    assert_eq!(
        kinds(&preview.source_to_target_changes),
        kinds(&applied.source_to_target_changes)
    );
    assert_eq!(trackers.target.issues().len(), 2);
}
