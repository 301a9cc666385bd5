use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use pushsync_core::{ArtifactKind, ScheduleState};

use crate::error::TrackerError;
use crate::wire::{
    Collection, CreateResult, NewChange, NewChangeset, NewRepository, OperationResult, Query,
    QueryResult,
};
use crate::Tracker;

/// One call received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Query(Query),
    CreateRepository(NewRepository),
    CreateChangeset(NewChangeset),
    CreateChange(NewChange),
    UpdateState {
        artifact_ref: String,
        kind: ArtifactKind,
        state: ScheduleState,
    },
}

#[derive(Default)]
struct MockState {
    results: HashMap<Query, Vec<String>>,
    failing_queries: HashSet<Collection>,
    failing_changesets: HashSet<String>,
    blank_changesets: HashSet<String>,
    failing_changes: HashSet<String>,
    state_override: Option<String>,
    calls: Vec<Call>,
    created: u64,
}

/// In-memory tracker for tests. Queries answer from the configured results
/// (no results when nothing was configured); creates succeed with a fresh
/// reference unless configured to fail; state updates echo the requested state.
pub struct MockTracker {
    state: Mutex<MockState>,
    latency: Duration,
}

impl Default for MockTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            latency: Duration::ZERO,
        }
    }

    /// Delay every call, so concurrent callers interleave.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make `query` answer with these references.
    pub fn set_results(&self, query: Query, refs: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .results
            .insert(query, refs.iter().map(|r| r.to_string()).collect());
    }

    /// Every query against `collection` fails with HTTP 503.
    pub fn fail_queries(&self, collection: Collection) {
        self.state.lock().unwrap().failing_queries.insert(collection);
    }

    /// Creating the changeset for `revision` fails with HTTP 500.
    pub fn fail_changeset(&self, revision: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_changesets
            .insert(revision.to_string());
    }

    /// Creating the changeset for `revision` "succeeds" without a reference.
    pub fn blank_changeset(&self, revision: &str) {
        self.state
            .lock()
            .unwrap()
            .blank_changesets
            .insert(revision.to_string());
    }

    /// Creating a change row for `path` fails with HTTP 500.
    pub fn fail_change(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_changes
            .insert(path.to_string());
    }

    /// State updates report `state` instead of echoing the requested one.
    pub fn report_state(&self, state: &str) {
        self.state.lock().unwrap().state_override = Some(state.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of queries issued against `collection`.
    pub fn query_count(&self, collection: Collection) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Query(q) if q.collection == collection))
            .count()
    }

    pub fn changesets(&self) -> Vec<NewChangeset> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateChangeset(cs) => Some(cs),
                _ => None,
            })
            .collect()
    }

    pub fn changes(&self) -> Vec<NewChange> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateChange(ch) => Some(ch),
                _ => None,
            })
            .collect()
    }

    pub fn state_updates(&self) -> Vec<(String, ScheduleState)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UpdateState {
                    artifact_ref,
                    state,
                    ..
                } => Some((artifact_ref, state)),
                _ => None,
            })
            .collect()
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn next_ref(state: &mut MockState, path: &str) -> String {
        state.created += 1;
        format!("https://mock.tracker/slm/webservice/v2.0/{path}/{}", state.created)
    }
}

fn unavailable(url: &str, status: u16) -> TrackerError {
    TrackerError::Status {
        url: format!("https://mock.tracker/slm/webservice/v2.0/{url}"),
        status,
    }
}

#[async_trait::async_trait]
impl Tracker for MockTracker {
    async fn query(&self, query: &Query) -> Result<QueryResult, TrackerError> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Query(query.clone()));
        if state.failing_queries.contains(&query.collection) {
            return Err(unavailable(query.collection.path(), 503));
        }
        let refs = state.results.get(query).cloned().unwrap_or_default();
        Ok(QueryResult::from_refs(&refs))
    }

    async fn create_repository(&self, repo: &NewRepository) -> Result<CreateResult, TrackerError> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateRepository(repo.clone()));
        let reference = Self::next_ref(&mut state, "scmrepository");
        Ok(CreateResult::created(&reference))
    }

    async fn create_changeset(
        &self,
        changeset: &NewChangeset,
    ) -> Result<CreateResult, TrackerError> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateChangeset(changeset.clone()));
        if state.failing_changesets.contains(&changeset.revision) {
            return Err(unavailable("changeset/create", 500));
        }
        if state.blank_changesets.contains(&changeset.revision) {
            return Ok(CreateResult::default());
        }
        let reference = Self::next_ref(&mut state, "changeset");
        Ok(CreateResult::created(&reference))
    }

    async fn create_change(&self, change: &NewChange) -> Result<CreateResult, TrackerError> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateChange(change.clone()));
        if state.failing_changes.contains(&change.path_and_filename) {
            return Err(unavailable("change/create", 500));
        }
        let reference = Self::next_ref(&mut state, "change");
        Ok(CreateResult::created(&reference))
    }

    async fn update_state(
        &self,
        artifact_ref: &str,
        kind: ArtifactKind,
        new_state: ScheduleState,
    ) -> Result<OperationResult, TrackerError> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UpdateState {
            artifact_ref: artifact_ref.to_string(),
            kind,
            state: new_state,
        });
        let reported = state
            .state_override
            .clone()
            .unwrap_or_else(|| new_state.as_str().to_string());
        Ok(OperationResult::with_state(&reported))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_query_has_no_results() {
        let mock = MockTracker::new();
        let result = mock.query(&Query::workspace("Acme")).await.unwrap();
        assert_eq!(result.total_result_count, 0);
        assert_eq!(mock.query_count(Collection::Workspace), 1);
    }

    #[tokio::test]
    async fn configured_query_answers() {
        let mock = MockTracker::new();
        mock.set_results(Query::user("a@b.c"), &["user/1"]);
        let result = mock.query(&Query::user("a@b.c")).await.unwrap();
        assert_eq!(result.single(), Some("user/1"));
    }

    #[tokio::test]
    async fn failing_collection_errors() {
        let mock = MockTracker::new();
        mock.fail_queries(Collection::User);
        let err = mock.query(&Query::user("a@b.c")).await.unwrap_err();
        assert!(matches!(err, TrackerError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn creates_return_fresh_refs() {
        let mock = MockTracker::new();
        let repo = NewRepository::github("w", "https://g/w", "ws/1");
        let a = mock.create_repository(&repo).await.unwrap();
        let b = mock.create_repository(&repo).await.unwrap();
        assert_ne!(a.reference(), b.reference());
        assert!(a.reference().is_some());
    }

    #[tokio::test]
    async fn state_update_echoes_unless_overridden() {
        let mock = MockTracker::new();
        let echoed = mock
            .update_state("story/1", ArtifactKind::Requirement, ScheduleState::Completed)
            .await
            .unwrap();
        assert_eq!(echoed.schedule_state(), Some("Completed"));

        mock.report_state("Defined");
        let overridden = mock
            .update_state("story/1", ArtifactKind::Requirement, ScheduleState::Completed)
            .await
            .unwrap();
        assert_eq!(overridden.schedule_state(), Some("Defined"));
        assert_eq!(mock.state_updates().len(), 2);
    }
}
