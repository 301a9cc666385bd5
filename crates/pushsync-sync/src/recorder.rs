use std::collections::BTreeMap;
use std::sync::Arc;

use pushsync_core::{blob_url, ArtifactId, Commit};
use pushsync_tracker::{NewChange, NewChangeset, Reference, Tracker};
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::report::CommitReport;
use crate::transition::StateTransitioner;
use crate::users::UserResolver;

/// Where a push's changesets are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    /// Tracker reference of the source repository record.
    pub repository_ref: String,
    /// Web URL of the repository, used to build commit and blob links.
    pub repository_url: String,
    pub branch: String,
}

/// Records one commit: state transitions, the changeset, and its change rows.
pub struct ChangesetRecorder {
    tracker: Arc<dyn Tracker>,
    users: UserResolver,
    transitions: StateTransitioner,
}

impl ChangesetRecorder {
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self {
            users: UserResolver::new(tracker.clone()),
            transitions: StateTransitioner::new(tracker.clone()),
            tracker,
        }
    }

    pub fn users(&self) -> &UserResolver {
        &self.users
    }

    /// Record `commit` against `target`, linking the already resolved
    /// `artifacts`.
    ///
    /// A failed state update or change row is counted and skipped. A failed
    /// changeset ends this commit: no change rows are attempted without one.
    pub async fn record(
        &self,
        target: &PushTarget,
        commit: &Commit,
        artifacts: &BTreeMap<ArtifactId, String>,
    ) -> CommitReport {
        let mut report = CommitReport::new(&commit.id);
        report.artifacts = artifacts.keys().map(ArtifactId::to_string).collect();

        // 1. Author
        report.author = self.users.resolve(&commit.author.email).await;

        // 2. Workflow states
        for (id, artifact_ref) in artifacts {
            match self.transitions.apply(&commit.message, id, artifact_ref).await {
                Ok(Some(state)) => report.states_applied.push((id.to_string(), state)),
                Ok(None) => {}
                Err(e) => {
                    warn!(revision = %commit.id, artifact = %id, error = %e, "state update failed");
                    report.states_failed += 1;
                }
            }
        }

        // 3. Changeset
        let changeset_ref = match self
            .create_changeset(target, commit, report.author.clone(), artifacts)
            .await
        {
            Ok(reference) => reference,
            Err(e) => {
                warn!(revision = %commit.id, error = %e, "changeset not recorded");
                report.error = Some(e.to_string());
                return report;
            }
        };
        debug!(revision = %commit.id, changeset = %changeset_ref, "changeset created");
        report.changeset = Some(changeset_ref.clone());

        // 4. Change rows
        for (action, path) in commit.changes() {
            let change = NewChange {
                action,
                changeset: changeset_ref.clone(),
                path_and_filename: path.to_string(),
                uri: blob_url(&target.repository_url, &target.branch, path),
            };
            match self.tracker.create_change(&change).await {
                Ok(_) => report.changes_recorded += 1,
                Err(e) => {
                    warn!(revision = %commit.id, path, action = action.as_str(), error = %e, "change not recorded");
                    report.changes_failed += 1;
                }
            }
        }

        report
    }

    async fn create_changeset(
        &self,
        target: &PushTarget,
        commit: &Commit,
        author: Option<String>,
        artifacts: &BTreeMap<ArtifactId, String>,
    ) -> Result<String, SyncError> {
        let changeset = NewChangeset {
            scm_repository: target.repository_ref.clone(),
            revision: commit.id.clone(),
            message: commit.message.clone(),
            uri: commit.web_url(&target.repository_url),
            commit_timestamp: commit.timestamp.clone(),
            author,
            artifacts: artifacts.values().map(|r| Reference::to(r)).collect(),
        };

        let failed = |reason: String| SyncError::Changeset {
            revision: commit.id.clone(),
            reason,
        };

        let result = self
            .tracker
            .create_changeset(&changeset)
            .await
            .map_err(|e| failed(e.to_string()))?;

        match result.reference() {
            Some(reference) => Ok(reference.to_string()),
            None if result.errors.is_empty() => Err(failed("tracker returned no reference".into())),
            None => Err(failed(result.errors.join("; "))),
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use pushsync_core::{ChangeAction, Identity, ScheduleState};
    use pushsync_tracker::{Call, Collection, MockTracker, Query};

    fn target() -> PushTarget {
        PushTarget {
            repository_ref: "repo/1".into(),
            repository_url: "https://github.com/acme/widgets".into(),
            branch: "main".into(),
        }
    }

    fn commit(id: &str, message: &str) -> Commit {
        Commit {
            id: id.into(),
            message: message.into(),
            timestamp: "2019-05-15T15:20:30-05:00".into(),
            author: Identity {
                name: "Jane".into(),
                email: "jane@example.com".into(),
            },
            added: vec!["src/new.rs".into()],
            modified: vec!["src/lib.rs".into(), "README.md".into()],
            removed: vec!["src/old.rs".into()],
        }
    }

    fn artifacts(pairs: &[(&str, &str)]) -> BTreeMap<ArtifactId, String> {
        pairs
            .iter()
            .map(|(id, r)| (ArtifactId::parse(id).unwrap(), r.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn records_changeset_and_changes() {
        let mock = Arc::new(MockTracker::new());
        mock.set_results(Query::user("jane@example.com"), &["user/7"]);
        let recorder = ChangesetRecorder::new(mock.clone());

        let report = recorder
            .record(&target(), &commit("abc", "US1 login"), &artifacts(&[("US1", "story/1")]))
            .await;

        assert!(report.is_complete());
        assert_eq!(report.author.as_deref(), Some("user/7"));
        assert_eq!(report.artifacts, vec!["US1"]);
        assert_eq!(report.changes_recorded, 4);

        let changesets = mock.changesets();
        assert_eq!(changesets.len(), 1);
        let cs = &changesets[0];
        assert_eq!(cs.scm_repository, "repo/1");
        assert_eq!(cs.revision, "abc");
        assert_eq!(cs.uri, "https://github.com/acme/widgets/commit/abc");
        assert_eq!(cs.author.as_deref(), Some("user/7"));
        assert_eq!(cs.artifacts, vec![Reference::to("story/1")]);

        let changes = mock.changes();
        let actions: Vec<_> = changes
            .iter()
            .map(|c| (c.action, c.path_and_filename.as_str()))
            .collect();
        assert_eq!(
            actions,
            vec![
                (ChangeAction::Added, "src/new.rs"),
                (ChangeAction::Modified, "src/lib.rs"),
                (ChangeAction::Modified, "README.md"),
                (ChangeAction::Removed, "src/old.rs"),
            ]
        );
        assert!(changes
            .iter()
            .all(|c| Some(c.changeset.as_str()) == report.changeset.as_deref()));
        assert_eq!(
            changes[0].uri,
            "https://github.com/acme/widgets/blob/main/src/new.rs"
        );
    }

    #[tokio::test]
    async fn unresolved_author_is_left_out() {
        let mock = Arc::new(MockTracker::new());
        let recorder = ChangesetRecorder::new(mock.clone());

        let report = recorder
            .record(&target(), &commit("abc", "chore"), &BTreeMap::new())
            .await;

        assert_eq!(report.author, None);
        assert!(report.changeset.is_some());
        let cs = &mock.changesets()[0];
        assert_eq!(cs.author, None);
        assert!(cs.artifacts.is_empty());
    }

    #[tokio::test]
    async fn author_is_looked_up_once_across_commits() {
        let mock = Arc::new(MockTracker::new());
        mock.set_results(Query::user("jane@example.com"), &["user/7"]);
        let recorder = ChangesetRecorder::new(mock.clone());

        for id in ["c1", "c2", "c3"] {
            recorder
                .record(&target(), &commit(id, "work"), &BTreeMap::new())
                .await;
        }
        assert_eq!(mock.query_count(Collection::User), 1);
        assert_eq!(mock.changesets().len(), 3);
    }

    #[tokio::test]
    async fn state_updates_happen_before_changeset() {
        let mock = Arc::new(MockTracker::new());
        let recorder = ChangesetRecorder::new(mock.clone());

        let report = recorder
            .record(
                &target(),
                &commit("abc", "COMPLETES US1 and STARTS TA2"),
                &artifacts(&[("US1", "story/1"), ("TA2", "task/2")]),
            )
            .await;

        assert_eq!(report.states_applied.len(), 2);
        assert!(report
            .states_applied
            .contains(&("US1".to_string(), ScheduleState::Completed)));
        assert!(report
            .states_applied
            .contains(&("TA2".to_string(), ScheduleState::InProgress)));

        let calls = mock.calls();
        let first_changeset = calls
            .iter()
            .position(|c| matches!(c, Call::CreateChangeset(_)))
            .unwrap();
        let last_update = calls
            .iter()
            .rposition(|c| matches!(c, Call::UpdateState { .. }))
            .unwrap();
        assert!(last_update < first_changeset);
    }

    #[tokio::test]
    async fn state_mismatch_does_not_block_changeset() {
        let mock = Arc::new(MockTracker::new());
        mock.report_state("Defined");
        let recorder = ChangesetRecorder::new(mock.clone());

        let report = recorder
            .record(
                &target(),
                &commit("abc", "FINISHES US1"),
                &artifacts(&[("US1", "story/1")]),
            )
            .await;

        assert_eq!(report.states_failed, 1);
        assert!(report.changeset.is_some());
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn failed_change_row_does_not_stop_the_rest() {
        let mock = Arc::new(MockTracker::new());
        mock.fail_change("src/lib.rs");
        let recorder = ChangesetRecorder::new(mock.clone());

        let report = recorder
            .record(&target(), &commit("abc", "work"), &BTreeMap::new())
            .await;

        assert_eq!(report.changes_recorded, 3);
        assert_eq!(report.changes_failed, 1);
        assert_eq!(mock.changes().len(), 4);
    }

    #[tokio::test]
    async fn failed_changeset_skips_change_rows() {
        let mock = Arc::new(MockTracker::new());
        mock.fail_changeset("abc");
        let recorder = ChangesetRecorder::new(mock.clone());

        let report = recorder
            .record(&target(), &commit("abc", "work"), &BTreeMap::new())
            .await;

        assert!(report.changeset.is_none());
        assert!(report.error.as_deref().unwrap().contains("abc"));
        assert!(mock.changes().is_empty());
    }

    #[tokio::test]
    async fn changeset_without_reference_is_a_failure() {
        let mock = Arc::new(MockTracker::new());
        mock.blank_changeset("abc");
        let recorder = ChangesetRecorder::new(mock.clone());

        let report = recorder
            .record(&target(), &commit("abc", "work"), &BTreeMap::new())
            .await;

        assert!(report.changeset.is_none());
        assert!(report.error.as_deref().unwrap().contains("no reference"));
        assert!(mock.changes().is_empty());
    }
}
