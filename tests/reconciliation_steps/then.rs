//! Then steps for reconciliation BDD scenarios.

use super::world::{ReconciliationWorld, run_async};
use rstest_bdd_macros::then;
use tracksync::sync::{
    adapters::memory::ProviderOperation,
    domain::{CANCELLED_LABEL, StateCategory},
    ports::SyncLedger,
};

#[then("the run is clean")]
fn run_is_clean(world: &ReconciliationWorld) -> Result<(), eyre::Report> {
    let result = world.result()?;
    if !result.is_clean() {
        return Err(eyre::eyre!("expected a clean run, got {result:?}"));
    }
    Ok(())
}

#[then("the number of source-to-target changes is {count:usize}")]
fn source_to_target_count(world: &ReconciliationWorld, count: usize) -> Result<(), eyre::Report> {
    let actual = world.result()?.source_to_target_changes.len();
    if actual != count {
        return Err(eyre::eyre!(
            "expected {count} source-to-target changes, found {actual}"
        ));
    }
    Ok(())
}

#[then(r#"the target has {count:usize} issue linked to "{source_id}""#)]
fn target_linked_count(
    world: &ReconciliationWorld,
    count: usize,
    source_id: String,
) -> Result<(), eyre::Report> {
    let linked = world
        .target
        .issues()
        .iter()
        .filter(|issue| {
            issue
                .link()
                .is_some_and(|link| link.external_id == source_id)
        })
        .count();
    if linked != count {
        return Err(eyre::eyre!(
            "expected {count} target issues linked to {source_id}, found {linked}"
        ));
    }
    Ok(())
}

#[then("the target has no issues")]
fn target_is_empty(world: &ReconciliationWorld) -> Result<(), eyre::Report> {
    let issues = world.target.issues();
    if !issues.is_empty() {
        return Err(eyre::eyre!("expected no target issues, found {issues:?}"));
    }
    Ok(())
}

#[then(r#"the run reports a conflict on "{field}""#)]
fn conflict_on_field(world: &ReconciliationWorld, field: String) -> Result<(), eyre::Report> {
    let result = world.result()?;
    let [conflict] = result.conflicts.as_slice() else {
        return Err(eyre::eyre!(
            "expected exactly one conflict, found {}",
            result.conflicts.len()
        ));
    };
    let fields: Vec<&str> = conflict
        .field_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();
    if fields != [field.as_str()] {
        return Err(eyre::eyre!("expected conflict on {field}, found {fields:?}"));
    }
    Ok(())
}

#[then(r#"the target issue "{id}" is titled "{title}""#)]
fn target_titled(
    world: &ReconciliationWorld,
    id: String,
    title: String,
) -> Result<(), eyre::Report> {
    let issue = world
        .target
        .issue(&id)
        .ok_or_else(|| eyre::eyre!("missing target issue {id}"))?;
    if issue.title != title {
        return Err(eyre::eyre!(
            "expected title {title:?}, found {:?}",
            issue.title
        ));
    }
    Ok(())
}

#[then(r#"the target issue "{id}" is cancelled"#)]
fn target_cancelled(world: &ReconciliationWorld, id: String) -> Result<(), eyre::Report> {
    let issue = world
        .target
        .issue(&id)
        .ok_or_else(|| eyre::eyre!("missing target issue {id}"))?;
    if issue.state.category != StateCategory::Done || !issue.has_label(CANCELLED_LABEL) {
        return Err(eyre::eyre!("expected {id} to be cancelled, found {issue:?}"));
    }
    Ok(())
}

#[then(r#"the ledger still links "{source_id}" to "{target_id}""#)]
fn ledger_still_links(
    world: &ReconciliationWorld,
    source_id: String,
    target_id: String,
) -> Result<(), eyre::Report> {
    let entry = run_async(world.ledger.lookup(&source_id))?
        .ok_or_else(|| eyre::eyre!("ledger lost entry for {source_id}"))?;
    if entry.target_id() != target_id {
        return Err(eyre::eyre!(
            "expected {source_id} linked to {target_id}, found {}",
            entry.target_id()
        ));
    }
    Ok(())
}

#[then("the source tracker was fetched {count:usize} times")]
fn source_fetch_count(world: &ReconciliationWorld, count: usize) -> Result<(), eyre::Report> {
    let calls = world.source.call_count(ProviderOperation::GetIssues);
    if calls != count {
        return Err(eyre::eyre!("expected {count} fetches, found {calls}"));
    }
    Ok(())
}
