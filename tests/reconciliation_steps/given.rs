//! Given steps for reconciliation BDD scenarios.

use super::world::{ReconciliationWorld, run_async, seeded_issue};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use tracksync::sync::{
    adapters::memory::{InMemoryProvider, ProviderOperation},
    domain::{Fingerprint, IssueLink, LedgerEntry, NormalizedLabel},
    ports::{ProviderError, SyncLedger},
};

fn parse_labels(labels: &str) -> Vec<NormalizedLabel> {
    labels
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(NormalizedLabel::new)
        .collect()
}

fn relabel(provider: &InMemoryProvider, id: &str, labels: &str) -> Result<(), eyre::Report> {
    let mut issue = provider
        .issue(id)
        .ok_or_else(|| eyre::eyre!("missing issue {id} in scenario world"))?;
    issue.labels = parse_labels(labels);
    provider.insert_issue(issue);
    Ok(())
}

#[given(r#"a source issue "{id}" titled "{title}" in state "{state}""#)]
fn source_issue(world: &mut ReconciliationWorld, id: String, title: String, state: String) {
    world
        .source
        .insert_issue(seeded_issue(&id, &title, &state, "source"));
}

#[given(r#"a target issue "{id}" linked to "{source_id}" titled "{title}" in state "{state}""#)]
fn linked_target_issue(
    world: &mut ReconciliationWorld,
    id: String,
    source_id: String,
    title: String,
    state: String,
) {
    world.target.insert_issue(
        seeded_issue(&id, &title, &state, "target").with_link(IssueLink::new(source_id, "source")),
    );
}

#[given(r#"the source issue "{id}" has labels "{labels}""#)]
fn source_issue_labels(
    world: &mut ReconciliationWorld,
    id: String,
    labels: String,
) -> Result<(), eyre::Report> {
    relabel(&world.source, &id, &labels)
}

#[given(r#"the target issue "{id}" has labels "{labels}""#)]
fn target_issue_labels(
    world: &mut ReconciliationWorld,
    id: String,
    labels: String,
) -> Result<(), eyre::Report> {
    relabel(&world.target, &id, &labels)
}

#[given(r#"the ledger links "{source_id}" to "{target_id}""#)]
fn ledger_links(
    world: &mut ReconciliationWorld,
    source_id: String,
    target_id: String,
) -> Result<(), eyre::Report> {
    let fingerprint = world
        .target
        .issue(&target_id)
        .map(|issue| Fingerprint::of(&issue))
        .ok_or_else(|| eyre::eyre!("missing target issue {target_id} in scenario world"))?;
    run_async(
        world
            .ledger
            .upsert(&LedgerEntry::new(source_id, target_id, fingerprint)),
    )
    .wrap_err("seed ledger entry")
}

#[given("the source tracker is rate limited once")]
fn source_rate_limited_once(world: &mut ReconciliationWorld) {
    world.source.fail_next(
        ProviderOperation::GetIssues,
        ProviderError::rate_limited("source", "secondary rate limit"),
    );
}
