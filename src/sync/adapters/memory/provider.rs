//! In-memory issue provider.

use async_trait::async_trait;
use mockable::Clock;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::sync::{
    domain::{
        IssuePatch, NewIssue, NormalizedIssue, NormalizedLabel, NormalizedState, StateCategory,
        StateMappingConfig,
    },
    ports::{IssueProvider, ProviderError, ProviderResult},
};

/// Operations of the provider port, for call accounting and failure
/// scripting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOperation {
    /// [`IssueProvider::get_issues`].
    GetIssues,
    /// [`IssueProvider::get_issue`].
    GetIssue,
    /// [`IssueProvider::create_issue`].
    CreateIssue,
    /// [`IssueProvider::update_issue`].
    UpdateIssue,
    /// [`IssueProvider::delete_issue`].
    DeleteIssue,
    /// [`IssueProvider::get_labels`].
    GetLabels,
    /// [`IssueProvider::get_states`].
    GetStates,
}

/// Thread-safe provider backed by an in-memory issue list.
///
/// State names are folded through the provider's own mapping table on every
/// write, and `updated_at` is stamped from the injected clock, so the
/// provider behaves like a remote tracker that only stores state names.
#[derive(Clone)]
pub struct InMemoryProvider {
    name: String,
    mapping: StateMappingConfig,
    clock: Arc<dyn Clock + Send + Sync>,
    state: Arc<RwLock<InMemoryProviderState>>,
}

#[derive(Debug, Default)]
struct InMemoryProviderState {
    issues: Vec<NormalizedIssue>,
    states: Vec<NormalizedState>,
    labels: Vec<NormalizedLabel>,
    calls: HashMap<ProviderOperation, usize>,
    failures: HashMap<ProviderOperation, VecDeque<ProviderError>>,
}

impl InMemoryProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        mapping: StateMappingConfig,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            name: name.into(),
            mapping,
            clock,
            state: Arc::new(RwLock::new(InMemoryProviderState::default())),
        }
    }

    /// Seeds the state catalog from native state names.
    #[must_use]
    pub fn with_states<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let states: Vec<NormalizedState> = names
            .into_iter()
            .map(|name| self.mapping.normalize(name.as_ref()))
            .collect();
        self.mutate(|state| state.states = states);
        self
    }

    /// Seeds the label catalog.
    #[must_use]
    pub fn with_labels(self, labels: impl IntoIterator<Item = NormalizedLabel>) -> Self {
        let labels: Vec<NormalizedLabel> = labels.into_iter().collect();
        self.mutate(|state| state.labels = labels);
        self
    }

    /// Seeds issues, owned by this provider.
    #[must_use]
    pub fn with_issues(self, issues: impl IntoIterator<Item = NormalizedIssue>) -> Self {
        for issue in issues {
            self.insert_issue(issue);
        }
        self
    }

    /// Inserts or replaces an issue without touching its timestamps.
    ///
    /// Simulates an edit made directly in the tracker.
    pub fn insert_issue(&self, mut issue: NormalizedIssue) {
        issue.source_provider.clone_from(&self.name);
        issue.state.category = self.mapping.category_of(&issue.state.name);
        self.mutate(|state| {
            if let Some(existing) = state.issues.iter_mut().find(|i| i.id == issue.id) {
                *existing = issue;
            } else {
                state.issues.push(issue);
            }
        });
    }

    /// Removes an issue, simulating a deletion in the tracker.
    pub fn remove_issue(&self, id: &str) {
        self.mutate(|state| state.issues.retain(|issue| issue.id != id));
    }

    /// Returns a snapshot of every stored issue.
    #[must_use]
    pub fn issues(&self) -> Vec<NormalizedIssue> {
        self.read(|state| state.issues.clone())
    }

    /// Returns a stored issue by identifier.
    #[must_use]
    pub fn issue(&self, id: &str) -> Option<NormalizedIssue> {
        self.read(|state| state.issues.iter().find(|issue| issue.id == id).cloned())
    }

    /// Returns how many times `operation` was invoked, failures included.
    #[must_use]
    pub fn call_count(&self, operation: ProviderOperation) -> usize {
        self.read(|state| state.calls.get(&operation).copied().unwrap_or_default())
    }

    /// Makes the next invocation of `operation` fail with `error`.
    ///
    /// Calls queue up: scripting two failures fails the next two calls.
    pub fn fail_next(&self, operation: ProviderOperation, error: ProviderError) {
        self.mutate(|state| {
            state.failures.entry(operation).or_default().push_back(error);
        });
    }

    fn read<T>(&self, f: impl FnOnce(&InMemoryProviderState) -> T) -> T {
        let guard = self
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&guard)
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut InMemoryProviderState) -> T) -> T {
        let mut guard = self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    /// Counts the call and pops a scripted failure, if any.
    fn begin(&self, operation: ProviderOperation) -> ProviderResult<()> {
        self.mutate(|state| {
            *state.calls.entry(operation).or_default() += 1;
            state
                .failures
                .get_mut(&operation)
                .and_then(VecDeque::pop_front)
                .map_or(Ok(()), Err)
        })
    }

    fn missing_issue(&self, id: &str) -> ProviderError {
        ProviderError::not_found(&self.name, format!("issue {id}"))
    }

    fn closed_state(&self, catalog: &[NormalizedState]) -> NormalizedState {
        catalog
            .iter()
            .find(|state| state.category == StateCategory::Done)
            .cloned()
            .unwrap_or_else(|| NormalizedState::new(StateCategory::Done, "closed"))
    }
}

#[async_trait]
impl IssueProvider for InMemoryProvider {
    async fn get_issues(&self) -> ProviderResult<Vec<NormalizedIssue>> {
        self.begin(ProviderOperation::GetIssues)?;
        Ok(self.issues())
    }

    async fn get_issue(&self, id: &str) -> ProviderResult<NormalizedIssue> {
        self.begin(ProviderOperation::GetIssue)?;
        self.issue(id).ok_or_else(|| self.missing_issue(id))
    }

    async fn create_issue(&self, issue: NewIssue) -> ProviderResult<NormalizedIssue> {
        self.begin(ProviderOperation::CreateIssue)?;
        let mut created = issue.into_issue(Uuid::new_v4().to_string(), &self.name, self.clock.utc());
        created.state.category = self.mapping.category_of(&created.state.name);
        self.mutate(|state| state.issues.push(created.clone()));
        Ok(created)
    }

    async fn update_issue(&self, id: &str, patch: IssuePatch) -> ProviderResult<NormalizedIssue> {
        self.begin(ProviderOperation::UpdateIssue)?;
        let timestamp = self.clock.utc();
        let updated = self.mutate(|state| {
            state.issues.iter_mut().find(|issue| issue.id == id).map(|issue| {
                issue.apply_patch(&patch);
                issue.state.category = self.mapping.category_of(&issue.state.name);
                issue.updated_at = timestamp;
                issue.clone()
            })
        });
        updated.ok_or_else(|| self.missing_issue(id))
    }

    async fn delete_issue(&self, id: &str) -> ProviderResult<()> {
        self.begin(ProviderOperation::DeleteIssue)?;
        let timestamp = self.clock.utc();
        let closed = self.mutate(|state| {
            let closed_state = self.closed_state(&state.states);
            state.issues.iter_mut().find(|issue| issue.id == id).map(|issue| {
                issue.state = closed_state;
                issue.updated_at = timestamp;
            })
        });
        closed.ok_or_else(|| self.missing_issue(id))
    }

    async fn get_labels(&self) -> ProviderResult<Vec<NormalizedLabel>> {
        self.begin(ProviderOperation::GetLabels)?;
        Ok(self.read(|state| state.labels.clone()))
    }

    async fn get_states(&self) -> ProviderResult<Vec<NormalizedState>> {
        self.begin(ProviderOperation::GetStates)?;
        Ok(self.read(|state| state.states.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn state_mapping_config(&self) -> &StateMappingConfig {
        &self.mapping
    }
}
