//! The reconciliation engine.
//!
//! A run fetches both issue sets, pairs them, and then walks every pair
//! strictly in sequence (source issues first, then orphaned targets). Each
//! pair ends in exactly one of: nothing to do, a propagated change, a
//! reported conflict, a declined proposal, or a collected error. Only ledger
//! failures stop the walk early.

use super::{
    SyncServiceError, SyncServiceResult,
    apply::{UnitError, issue_scope, resolve_labels, resolve_state, with_marker_label},
    retry::RetryPolicy,
};
use crate::sync::{
    domain::{
        CANCELLED_LABEL, ChangeKind, FieldDifference, FieldValue, Fingerprint, IssueChange,
        IssueConflict, IssueField, IssueLink, IssueMetadata, IssuePair, IssuePatch, LedgerEntry,
        NewIssue, NormalizedIssue, NormalizedLabel, NormalizedState, PairStatus, ProposedChange,
        ProviderRole, StateCategory, SyncDomainError, SyncErrorScope, SyncOptions, SyncResult,
        diff, match_issues,
    },
    ports::{
        AcceptAll, ChangeReviewer, IssueProvider, ProviderResult, ReviewDecision, SyncLedger,
    },
};
use mockable::Clock;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, warn};

/// State and label catalogs of one provider, fetched at most once per run.
#[derive(Debug, Default)]
struct ProviderCatalog {
    states: Option<Vec<NormalizedState>>,
    labels: Option<Vec<NormalizedLabel>>,
}

/// Mutable bookkeeping of a single run.
#[derive(Debug, Default)]
struct RunState {
    result: SyncResult,
    source_catalog: ProviderCatalog,
    target_catalog: ProviderCatalog,
    aborted: bool,
}

impl RunState {
    const fn catalog(&mut self, role: ProviderRole) -> &mut ProviderCatalog {
        match role {
            ProviderRole::Source => &mut self.source_catalog,
            ProviderRole::Target => &mut self.target_catalog,
        }
    }

    /// Adds a change that reached (or, in a dry run, would reach) the receiver.
    fn record(
        &mut self,
        kind: ChangeKind,
        receiver: ProviderRole,
        originator: String,
        issue: NormalizedIssue,
    ) {
        info!(
            kind = %kind,
            receiver = %receiver,
            issue_id = %issue.id,
            dry_run = self.result.dry_run,
            "propagated change"
        );
        let change = IssueChange {
            source: originator,
            kind,
            issue,
        };
        match receiver {
            ProviderRole::Target => self.result.source_to_target_changes.push(change),
            ProviderRole::Source => self.result.target_to_source_changes.push(change),
        }
    }

    fn fail(&mut self, scope: SyncErrorScope, err: UnitError) {
        if err.is_fatal() {
            self.aborted = true;
        }
        let error = err.into_sync_error(scope);
        warn!(scope = %error.scope, kind = error.kind.as_str(), "{}", error.message);
        self.result.errors.push(error);
    }
}

/// What a planned change does on the receiving provider.
#[derive(Debug)]
enum PlannedAction {
    Create(NewIssue),
    Update(IssuePatch),
}

/// A change ready for review and application.
#[derive(Debug)]
struct PlannedChange<'a> {
    kind: ChangeKind,
    receiver: ProviderRole,
    /// Issue whose data is propagated.
    origin: &'a NormalizedIssue,
    /// Issue being mutated; `None` for creations.
    subject: Option<&'a NormalizedIssue>,
    action: PlannedAction,
    differences: Vec<FieldDifference>,
    /// Ledger key of the pair.
    source_id: &'a str,
    is_derived_item: bool,
}

/// Keeps a source and a target provider reconciled.
///
/// The engine is generic over both providers and the ledger and never
/// inspects provider identity beyond [`IssueProvider::name`] and
/// [`IssueProvider::is_source_of_truth`].
pub struct ReconciliationEngine<S, T, L, C>
where
    S: IssueProvider,
    T: IssueProvider,
    L: SyncLedger,
    C: Clock + Send + Sync,
{
    source: Arc<S>,
    target: Arc<T>,
    ledger: Arc<L>,
    clock: Arc<C>,
    reviewer: Arc<dyn ChangeReviewer>,
    options: SyncOptions,
    retry: RetryPolicy,
}

impl<S, T, L, C> ReconciliationEngine<S, T, L, C>
where
    S: IssueProvider,
    T: IssueProvider,
    L: SyncLedger,
    C: Clock + Send + Sync,
{
    /// Creates an engine over two providers and a ledger.
    ///
    /// # Errors
    ///
    /// Returns [`SyncServiceError::Validation`] when a provider name is empty
    /// or both providers share a name.
    pub fn new(
        source: Arc<S>,
        target: Arc<T>,
        ledger: Arc<L>,
        clock: Arc<C>,
        options: SyncOptions,
    ) -> SyncServiceResult<Self> {
        if source.name().trim().is_empty() || target.name().trim().is_empty() {
            return Err(SyncServiceError::Validation(
                SyncDomainError::EmptyProviderName,
            ));
        }
        if source.name() == target.name() {
            return Err(SyncServiceError::Validation(
                SyncDomainError::DuplicateProviderName(source.name().to_owned()),
            ));
        }
        let retry = RetryPolicy::new(options.retry_delay());
        Ok(Self {
            source,
            target,
            ledger,
            clock,
            reviewer: Arc::new(AcceptAll),
            options,
            retry,
        })
    }

    /// Installs a reviewer consulted before every mutation.
    #[must_use]
    pub fn with_reviewer(mut self, reviewer: Arc<dyn ChangeReviewer>) -> Self {
        self.reviewer = reviewer;
        self
    }

    /// Returns the run options.
    #[must_use]
    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    fn provider(&self, role: ProviderRole) -> &dyn IssueProvider {
        match role {
            ProviderRole::Source => &*self.source,
            ProviderRole::Target => &*self.target,
        }
    }

    /// Runs one reconciliation pass.
    ///
    /// Never fails as a whole: failures are collected in
    /// [`SyncResult::errors`]. A fetch failure or a ledger failure ends the
    /// run early with whatever was accumulated.
    pub async fn sync(&self) -> SyncResult {
        let mut run = RunState::default();
        run.result.dry_run = self.options.dry_run;
        info!(
            source = self.source.name(),
            target = self.target.name(),
            direction = %self.options.direction,
            dry_run = self.options.dry_run,
            "starting reconciliation run"
        );

        let (source_issues, target_issues) = tokio::join!(
            self.fetch(ProviderRole::Source),
            self.fetch(ProviderRole::Target)
        );
        let (sources, targets) = match (source_issues, target_issues) {
            (Ok(sources), Ok(targets)) => (sources, targets),
            (source_issues, target_issues) => {
                for (role, outcome) in [
                    (ProviderRole::Source, source_issues),
                    (ProviderRole::Target, target_issues),
                ] {
                    if let Err(err) = outcome {
                        run.fail(SyncErrorScope::Fetch { role }, UnitError::Provider(err));
                    }
                }
                return run.result;
            }
        };

        let report = match_issues(&sources, &targets, self.source.name());
        for ambiguous in &report.ambiguous {
            warn!(
                source_id = %ambiguous.source_id,
                candidates = ?ambiguous.candidate_ids,
                "content match has several candidates, linking the first"
            );
        }
        debug!(
            pairs = report.pairs.len(),
            orphans = report.orphaned_targets.len(),
            unmatched = report.unmatched_targets.len(),
            "matched issue sets"
        );

        for pair in parents_first(&report.pairs) {
            if run.aborted {
                break;
            }
            if let Err(err) = self.process_pair(&mut run, pair).await {
                run.fail(issue_scope(ProviderRole::Source, &pair.source.id), err);
            }
        }
        for orphan in &report.orphaned_targets {
            if run.aborted {
                break;
            }
            if let Err(err) = self.cancel_orphan(&mut run, orphan).await {
                run.fail(issue_scope(ProviderRole::Target, &orphan.id), err);
            }
        }

        if !self.options.dry_run
            && run.result.errors.is_empty()
            && let Err(err) = self.ledger.record_sync_timestamp(self.clock.utc()).await
        {
            run.fail(SyncErrorScope::Ledger, UnitError::Ledger(err));
        }

        info!(summary = %run.result.summary(), "reconciliation run finished");
        run.result
    }

    async fn fetch(&self, role: ProviderRole) -> ProviderResult<Vec<NormalizedIssue>> {
        let provider = self.provider(role);
        let issues = self
            .retry
            .run("get_issues", move || provider.get_issues())
            .await?;
        let (owned, foreign): (Vec<_>, Vec<_>) = issues
            .into_iter()
            .partition(|issue| provider.is_source_of_truth(issue));
        if !foreign.is_empty() {
            warn!(
                provider = provider.name(),
                ignored = foreign.len(),
                "ignoring fetched issues owned by another provider"
            );
        }
        Ok(owned)
    }

    async fn process_pair(&self, run: &mut RunState, pair: &IssuePair<'_>) -> Result<(), UnitError> {
        let direction = self.options.direction;
        match (pair.status, pair.target) {
            (PairStatus::New, _) if direction.allows_source_to_target() => {
                self.create_in_target(run, pair.source).await
            }
            (PairStatus::LinkedNeedsBackfill, Some(target))
                if direction.allows_source_to_target() =>
            {
                self.link_target(run, pair.source, target).await
            }
            (PairStatus::SourceAhead | PairStatus::TargetAhead | PairStatus::Tied, Some(target)) => {
                self.reconcile_linked(run, pair.source, target, pair.status)
                    .await
            }
            (status, _) => {
                debug!(
                    source_id = %pair.source.id,
                    status = %status,
                    direction = %direction,
                    "direction does not allow this change, skipping"
                );
                Ok(())
            }
        }
    }

    async fn create_in_target(
        &self,
        run: &mut RunState,
        source: &NormalizedIssue,
    ) -> Result<(), UnitError> {
        if let Some(entry) = self.ledger.lookup(&source.id).await? {
            return Err(UnitError::LinkedTargetMissing {
                target_id: entry.target_id().to_owned(),
            });
        }

        let state = self.resolve_state(run, ProviderRole::Target, None, &source.state).await?;
        let labels = self
            .resolve_labels(run, ProviderRole::Target, &source.labels, &[])
            .await?;
        let parent_id = match &source.metadata.parent_id {
            Some(parent) => self
                .ledger
                .lookup(parent)
                .await?
                .map(|entry| entry.target_id().to_owned()),
            None => None,
        };
        let new_issue = NewIssue {
            title: source.title.clone(),
            description: source.description.clone(),
            state,
            labels,
            assignees: source.assignees.clone(),
            metadata: IssueMetadata {
                link: Some(IssueLink::new(&source.id, self.source.name())),
                parent_id,
                ..IssueMetadata::default()
            },
        };

        self.execute(
            run,
            PlannedChange {
                kind: ChangeKind::Create,
                receiver: ProviderRole::Target,
                origin: source,
                subject: None,
                action: PlannedAction::Create(new_issue),
                differences: Vec::new(),
                source_id: &source.id,
                is_derived_item: source.is_derived_item(),
            },
        )
        .await
    }

    async fn link_target(
        &self,
        run: &mut RunState,
        source: &NormalizedIssue,
        target: &NormalizedIssue,
    ) -> Result<(), UnitError> {
        let differences = diff(source, target);
        let mut patch = self
            .patch_from(run, ProviderRole::Target, source, target, &differences)
            .await?;
        patch.link = Some(IssueLink::new(&source.id, self.source.name()));

        self.execute(
            run,
            PlannedChange {
                kind: ChangeKind::Link,
                receiver: ProviderRole::Target,
                origin: source,
                subject: Some(target),
                action: PlannedAction::Update(patch),
                differences,
                source_id: &source.id,
                is_derived_item: source.is_derived_item(),
            },
        )
        .await
    }

    async fn reconcile_linked(
        &self,
        run: &mut RunState,
        source: &NormalizedIssue,
        target: &NormalizedIssue,
        status: PairStatus,
    ) -> Result<(), UnitError> {
        let differences = diff(source, target);
        if differences.is_empty() {
            debug!(source_id = %source.id, target_id = %target.id, "pair already in sync");
            return Ok(());
        }

        let direction = self.options.direction;
        let receiver = match status {
            PairStatus::SourceAhead if direction.allows_source_to_target() => ProviderRole::Target,
            PairStatus::TargetAhead if direction.allows_target_to_source() => ProviderRole::Source,
            _ => return self.report_conflict(run, source, target, differences).await,
        };
        let (origin, subject) = match receiver {
            ProviderRole::Target => (source, target),
            ProviderRole::Source => (target, source),
        };
        let patch = self
            .patch_from(run, receiver, origin, subject, &differences)
            .await?;

        self.execute(
            run,
            PlannedChange {
                kind: ChangeKind::Update,
                receiver,
                origin,
                subject: Some(subject),
                action: PlannedAction::Update(patch),
                differences,
                source_id: &source.id,
                is_derived_item: source.is_derived_item(),
            },
        )
        .await
    }

    async fn report_conflict(
        &self,
        run: &mut RunState,
        source: &NormalizedIssue,
        target: &NormalizedIssue,
        conflicting_fields: Vec<FieldDifference>,
    ) -> Result<(), UnitError> {
        let last_sync_fingerprint = self
            .ledger
            .lookup(&source.id)
            .await?
            .map(|entry| entry.last_fingerprint().clone());
        let conflict = IssueConflict {
            source_issue: source.clone(),
            target_issue: target.clone(),
            last_sync_fingerprint,
            conflicting_fields,
        };
        warn!(
            source_id = %source.id,
            target_id = %target.id,
            fields = ?conflict.field_names(),
            "conflicting edits, leaving both sides untouched"
        );
        run.result.conflicts.push(conflict);
        Ok(())
    }

    async fn cancel_orphan(
        &self,
        run: &mut RunState,
        target: &NormalizedIssue,
    ) -> Result<(), UnitError> {
        if !self.options.direction.allows_source_to_target() {
            return Ok(());
        }
        let Some(link) = target.link() else {
            return Ok(());
        };
        if target.state.category == StateCategory::Done && target.has_label(CANCELLED_LABEL) {
            debug!(target_id = %target.id, "orphaned target already cancelled");
            return Ok(());
        }

        let done = NormalizedState::new(StateCategory::Done, CANCELLED_LABEL);
        let state = self
            .resolve_state(run, ProviderRole::Target, Some(&target.state), &done)
            .await?;
        let marked = with_marker_label(&target.labels, CANCELLED_LABEL);
        let labels = self
            .resolve_labels(run, ProviderRole::Target, &marked, &target.labels)
            .await?;

        let mut patch = IssuePatch::default();
        let mut differences = Vec::new();
        if state.category != target.state.category {
            let mut cancelled = target.clone();
            cancelled.state = state.clone();
            differences.push(FieldDifference {
                field: IssueField::State,
                source_value: FieldValue::of(&cancelled, IssueField::State),
                target_value: FieldValue::of(target, IssueField::State),
            });
            patch.state = Some(state);
        }
        if labels.len() != target.labels.len() {
            differences.push(FieldDifference {
                field: IssueField::Labels,
                source_value: FieldValue::Names(
                    labels.iter().map(|label| label.name.clone()).collect(),
                ),
                target_value: FieldValue::of(target, IssueField::Labels),
            });
            patch.labels = Some(labels);
        }
        info!(
            target_id = %target.id,
            source_id = %link.external_id,
            "source issue disappeared, cancelling target"
        );

        self.execute(
            run,
            PlannedChange {
                kind: ChangeKind::Cancel,
                receiver: ProviderRole::Target,
                origin: target,
                subject: Some(target),
                action: PlannedAction::Update(patch),
                differences,
                source_id: &link.external_id,
                is_derived_item: target.is_derived_item(),
            },
        )
        .await
    }

    /// Builds a patch carrying the origin's values for every differing field.
    async fn patch_from(
        &self,
        run: &mut RunState,
        receiver: ProviderRole,
        origin: &NormalizedIssue,
        subject: &NormalizedIssue,
        differences: &[FieldDifference],
    ) -> Result<IssuePatch, UnitError> {
        let mut patch = IssuePatch::default();
        for difference in differences {
            match difference.field {
                IssueField::Title => patch.title = Some(origin.title.clone()),
                IssueField::Description => patch.description = Some(origin.description.clone()),
                IssueField::State => {
                    let state = self
                        .resolve_state(run, receiver, Some(&subject.state), &origin.state)
                        .await?;
                    patch.state = Some(state);
                }
                IssueField::Labels => {
                    let labels = self
                        .resolve_labels(run, receiver, &origin.labels, &subject.labels)
                        .await?;
                    patch.labels = Some(labels);
                }
                IssueField::Assignees => patch.assignees = Some(origin.assignees.clone()),
            }
        }
        Ok(patch)
    }

    async fn resolve_state(
        &self,
        run: &mut RunState,
        role: ProviderRole,
        current: Option<&NormalizedState>,
        desired: &NormalizedState,
    ) -> Result<NormalizedState, UnitError> {
        if let Some(state) = current.filter(|state| state.category == desired.category) {
            return Ok(state.clone());
        }
        let provider = self.provider(role);
        let catalog = match run.catalog(role).states.clone() {
            Some(states) => states,
            None => {
                let states = self
                    .retry
                    .run("get_states", move || provider.get_states())
                    .await?;
                run.catalog(role).states = Some(states.clone());
                states
            }
        };
        resolve_state(current, desired, &catalog, provider.state_mapping_config()).ok_or_else(
            || UnitError::StateUnavailable {
                provider: provider.name().to_owned(),
                category: desired.category,
            },
        )
    }

    async fn resolve_labels(
        &self,
        run: &mut RunState,
        role: ProviderRole,
        desired: &[NormalizedLabel],
        current: &[NormalizedLabel],
    ) -> Result<Vec<NormalizedLabel>, UnitError> {
        if desired.is_empty() {
            return Ok(Vec::new());
        }
        let provider = self.provider(role);
        let catalog = match run.catalog(role).labels.clone() {
            Some(labels) => labels,
            None => {
                let labels = self
                    .retry
                    .run("get_labels", move || provider.get_labels())
                    .await?;
                run.catalog(role).labels = Some(labels.clone());
                labels
            }
        };
        Ok(resolve_labels(desired, current, &catalog))
    }

    /// Reviews, applies and records a planned change.
    async fn execute(&self, run: &mut RunState, change: PlannedChange<'_>) -> Result<(), UnitError> {
        let receiver = self.provider(change.receiver);
        let originator = self.provider(change.receiver.opposite()).name().to_owned();

        if self.options.dry_run {
            let projected = project(&change, receiver.name(), self.clock.utc());
            run.record(change.kind, change.receiver, originator, projected);
            return Ok(());
        }

        let proposal = ProposedChange {
            kind: change.kind,
            receiver: change.receiver,
            origin: change.origin.clone(),
            subject: change.subject.cloned(),
            differences: change.differences.clone(),
        };
        if self.reviewer.review(&proposal).await == ReviewDecision::Reject {
            info!(
                kind = %proposal.kind,
                origin_id = %proposal.origin.id,
                "change declined by reviewer"
            );
            run.result.skipped.push(proposal);
            return Ok(());
        }

        let applied = match change.action {
            PlannedAction::Create(new_issue) => {
                self.retry
                    .run("create_issue", move || receiver.create_issue(new_issue.clone()))
                    .await?
            }
            PlannedAction::Update(patch) => {
                let subject_id = change.subject.map_or("", |issue| issue.id.as_str());
                self.retry
                    .run("update_issue", move || {
                        receiver.update_issue(subject_id, patch.clone())
                    })
                    .await?
            }
        };
        let target_id = match change.receiver {
            ProviderRole::Target => applied.id.clone(),
            ProviderRole::Source => change.origin.id.clone(),
        };
        let entry = LedgerEntry::new(change.source_id, target_id, Fingerprint::of(&applied))
            .derived(change.is_derived_item);
        // The mutation has happened; it is reported even if the ledger write fails.
        run.record(change.kind, change.receiver, originator, applied);
        self.advance_ledger(&entry).await
    }

    /// Records a propagated change, never relinking an existing entry.
    async fn advance_ledger(&self, entry: &LedgerEntry) -> Result<(), UnitError> {
        match self.ledger.lookup(entry.tracking_key()).await? {
            Some(existing) if !existing.same_link(entry) => {
                warn!(
                    tracking_key = entry.tracking_key(),
                    recorded = existing.target_id(),
                    proposed = entry.target_id(),
                    "ledger already links a different target, keeping the recorded link"
                );
                Ok(())
            }
            _ => Ok(self.ledger.upsert(entry).await?),
        }
    }
}

/// Orders pairs so that every derived item follows the parent it points at.
///
/// Created targets resolve their parent through the ledger, so a parent has
/// to be linked before its children are created. Order is otherwise kept.
fn parents_first<'p, 'a>(pairs: &'p [IssuePair<'a>]) -> Vec<&'p IssuePair<'a>> {
    let parents: HashMap<&str, &str> = pairs
        .iter()
        .filter_map(|pair| {
            pair.source
                .metadata
                .parent_id
                .as_deref()
                .map(|parent| (pair.source.id.as_str(), parent))
        })
        .collect();
    let depth = |id: &str| {
        let mut hops = 0_usize;
        let mut current = id;
        // Bounded by the number of links so a parent cycle cannot spin.
        while let Some(&parent) = parents.get(current)
            && hops < parents.len()
        {
            hops += 1;
            current = parent;
        }
        hops
    };
    let mut ordered: Vec<&IssuePair<'a>> = pairs.iter().collect();
    ordered.sort_by_cached_key(|pair| depth(pair.source.id.as_str()));
    ordered
}

/// Projects the outcome of a change without applying it.
fn project(
    change: &PlannedChange<'_>,
    receiver_name: &str,
    timestamp: chrono::DateTime<chrono::Utc>,
) -> NormalizedIssue {
    match (&change.action, change.subject) {
        (PlannedAction::Update(patch), Some(subject)) => {
            let mut projected = subject.clone();
            projected.apply_patch(patch);
            projected
        }
        (PlannedAction::Create(new_issue), _) => {
            new_issue
                .clone()
                .into_issue(String::new(), receiver_name, timestamp)
        }
        (PlannedAction::Update(_), None) => change.origin.clone(),
    }
}
