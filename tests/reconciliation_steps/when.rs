//! When steps for reconciliation BDD scenarios.

use super::world::{ReconciliationWorld, run_async};
use rstest_bdd_macros::when;

fn reconcile(world: &mut ReconciliationWorld, dry_run: bool) -> Result<(), eyre::Report> {
    let engine = world.engine(dry_run)?;
    world.last_result = Some(run_async(engine.sync()));
    Ok(())
}

#[when("the trackers are reconciled")]
fn trackers_reconciled(world: &mut ReconciliationWorld) -> Result<(), eyre::Report> {
    reconcile(world, false)
}

#[when("the trackers are reconciled as a dry run")]
fn trackers_reconciled_dry_run(world: &mut ReconciliationWorld) -> Result<(), eyre::Report> {
    reconcile(world, true)
}
