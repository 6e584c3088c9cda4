//! Reconciliation runs backed by the file ledger across engine restarts.

use std::sync::Arc;

use camino::Utf8PathBuf;
use rstest::rstest;
use tempfile::TempDir;
use tracksync::sync::{
    adapters::{file::FileLedger, memory::ProviderOperation},
    domain::SyncErrorKind,
    ports::SyncLedger,
};

use super::helpers::{Trackers, options, seeded_issue, trackers};

fn ledger_path(temp: &TempDir) -> eyre::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
        .map_err(|path| eyre::eyre!("non UTF-8 temp dir: {}", path.display()))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn links_survive_an_engine_restart(trackers: Trackers) -> eyre::Result<()> {
    let temp = TempDir::new()?;
    let path = ledger_path(&temp)?;
    trackers
        .source
        .insert_issue(seeded_issue("LIN-1", "Ship login", "Todo", "linear"));

    let first = trackers
        .engine(Arc::new(FileLedger::open(&path)?), options())
        .sync()
        .await;
    assert!(first.is_clean(), "unexpected result: {first:?}");
    let mirrored = trackers.target_for("LIN-1").expect("LIN-1 mirrored");

    let reopened = Arc::new(FileLedger::open(&path)?);
    let entry = reopened.lookup("LIN-1").await?.expect("link persisted");
    assert_eq!(entry.target_id(), mirrored.id);
    assert!(reopened.last_sync_timestamp().await?.is_some());

    trackers.target.remove_issue(&mirrored.id);
    let second = trackers.engine(reopened, options()).sync().await;

    let errors: Vec<SyncErrorKind> = second.errors.iter().map(|error| error.kind).collect();
    assert_eq!(errors, vec![SyncErrorKind::NotFound]);
    assert_eq!(trackers.target.call_count(ProviderOperation::CreateIssue), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dry_run_leaves_no_ledger_document(trackers: Trackers) -> eyre::Result<()> {
    let temp = TempDir::new()?;
    let path = ledger_path(&temp)?;
    trackers
        .source
        .insert_issue(seeded_issue("LIN-1", "Ship login", "Todo", "linear"));

    let result = trackers
        .engine(
            Arc::new(FileLedger::open(&path)?),
            options().with_dry_run(true),
        )
        .sync()
        .await;

    assert_eq!(result.source_to_target_changes.len(), 1);
    assert!(!path.join(FileLedger::FILE_NAME).exists());
    Ok(())
}
