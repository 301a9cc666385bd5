use std::sync::Arc;
use std::time::Duration;

use pushsync_core::config::{DEFAULT_MAX_CONCURRENT_PUSHES, DEFAULT_PUSH_TIMEOUT_SECS};
use pushsync_core::{Config, PushEvent};
use pushsync_tracker::{NewRepository, Query, Tracker};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::artifacts::ArtifactResolver;
use crate::error::SyncError;
use crate::recorder::{ChangesetRecorder, PushTarget};
use crate::report::PushReport;
use crate::users::UserResolver;

/// Entry point for inbound pushes.
///
/// `receive_push` checks the configured workspace before returning; the rest
/// of the work runs on a background task. At most `max_concurrent` pushes are
/// processed at once. Once `push_timeout` has passed, no further commit of
/// the push is started; a commit already underway is always finished, so a
/// changeset is never left without its change rows. Cloning is cheap and
/// clones share the author cache and the worker pool.
#[derive(Clone)]
pub struct PushOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    tracker: Arc<dyn Tracker>,
    workspace: String,
    artifacts: ArtifactResolver,
    recorder: ChangesetRecorder,
    permits: Arc<Semaphore>,
    push_timeout: Duration,
}

/// Completion handle of one accepted push. Dropping it detaches the push.
pub struct PushHandle {
    task: JoinHandle<PushReport>,
}

impl PushHandle {
    /// Wait for the background phase to finish.
    pub async fn wait(self) -> Result<PushReport, SyncError> {
        self.task
            .await
            .map_err(|e| SyncError::Task(e.to_string()))
    }
}

impl PushOrchestrator {
    pub fn new(tracker: Arc<dyn Tracker>, workspace: &str) -> Self {
        Self::with_limits(
            tracker,
            workspace,
            DEFAULT_MAX_CONCURRENT_PUSHES,
            Duration::from_secs(DEFAULT_PUSH_TIMEOUT_SECS),
        )
    }

    pub fn from_config(tracker: Arc<dyn Tracker>, config: &Config) -> Self {
        Self::with_limits(
            tracker,
            &config.workspace,
            config.max_concurrent_pushes,
            config.push_timeout(),
        )
    }

    pub fn with_limits(
        tracker: Arc<dyn Tracker>,
        workspace: &str,
        max_concurrent: usize,
        push_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                artifacts: ArtifactResolver::new(tracker.clone()),
                recorder: ChangesetRecorder::new(tracker.clone()),
                tracker,
                workspace: workspace.to_string(),
                permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
                push_timeout,
            }),
        }
    }

    pub fn workspace(&self) -> &str {
        &self.inner.workspace
    }

    pub fn users(&self) -> &UserResolver {
        self.inner.recorder.users()
    }

    /// Look up the configured workspace; exactly one match is required.
    pub async fn resolve_workspace(&self) -> Result<String, SyncError> {
        let name = &self.inner.workspace;
        let result = self.inner.tracker.query(&Query::workspace(name)).await?;
        match result.single() {
            Some(reference) => Ok(reference.to_string()),
            None => Err(SyncError::WorkspaceNotFound {
                name: name.clone(),
                matches: result.results.len(),
            }),
        }
    }

    /// Accept a push.
    ///
    /// Fails only when the workspace cannot be resolved; in that case no other
    /// tracker call is made. Otherwise the commits are processed in the
    /// background and the returned handle reports the outcome.
    pub async fn receive_push(&self, event: PushEvent) -> Result<PushHandle, SyncError> {
        let workspace_ref = self.resolve_workspace().await?;

        let span = info_span!(
            "push",
            repository = %event.repository.name,
            branch = %event.branch(),
            commits = event.commits.len(),
        );
        span.in_scope(|| info!("push accepted"));

        let inner = self.inner.clone();
        let task = tokio::spawn(async move { inner.run(workspace_ref, event).await }.instrument(span));
        Ok(PushHandle { task })
    }
}

impl Inner {
    async fn run(&self, workspace_ref: String, event: PushEvent) -> PushReport {
        let mut report = PushReport {
            repository: event.repository.name.clone(),
            branch: event.branch().to_string(),
            ..Default::default()
        };

        let _permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "worker pool closed");
                report.error = Some(SyncError::Task(e.to_string()).to_string());
                return report;
            }
        };

        let started = Instant::now();
        let deadline = started + self.push_timeout;
        let outcome = self.process(&workspace_ref, &event, deadline, &mut report).await;
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome.err() {
            Some(e) => {
                error!(
                    error = %e,
                    elapsed_ms = report.elapsed_ms,
                    commits_done = report.commits.len(),
                    "push aborted"
                );
                report.error = Some(e.to_string());
            }
            None => info!(
                elapsed_ms = report.elapsed_ms,
                changesets = report.changesets_created(),
                failed = report.commits_failed(),
                "push completed"
            ),
        }
        report
    }

    async fn process(
        &self,
        workspace_ref: &str,
        event: &PushEvent,
        deadline: Instant,
        report: &mut PushReport,
    ) -> Result<(), SyncError> {
        let repository_ref =
            tokio::time::timeout_at(deadline, self.resolve_repository(workspace_ref, event))
                .await
                .map_err(|_| SyncError::Timeout(self.push_timeout))??;
        report.repository_ref = Some(repository_ref.clone());

        let target = PushTarget {
            repository_ref,
            repository_url: event.repository.url.clone(),
            branch: event.branch().to_string(),
        };

        // Deadline is only checked between commits.
        for commit in &event.commits {
            if Instant::now() >= deadline {
                return Err(SyncError::Timeout(self.push_timeout));
            }
            let artifacts = self.artifacts.resolve(&commit.message).await;
            if !artifacts.is_empty() {
                debug!(revision = %commit.id, artifacts = artifacts.len(), "artifacts referenced");
            }
            let commit_report = self.recorder.record(&target, commit, &artifacts).await;
            report.commits.push(commit_report);
        }
        Ok(())
    }

    /// Find the repository record by name, creating it when absent.
    async fn resolve_repository(
        &self,
        workspace_ref: &str,
        event: &PushEvent,
    ) -> Result<String, SyncError> {
        let name = &event.repository.name;
        let existing = self.tracker.query(&Query::repository(name)).await?;
        if let Some(reference) = existing.first() {
            debug!(repository = %name, reference, "repository found");
            return Ok(reference.to_string());
        }

        let repo = NewRepository::github(name, &event.repository.url, workspace_ref);
        let created = self.tracker.create_repository(&repo).await?;
        match created.reference() {
            Some(reference) => {
                info!(repository = %name, reference, "repository created");
                Ok(reference.to_string())
            }
            None => {
                warn!(repository = %name, errors = ?created.errors, "repository create returned no reference");
                Err(SyncError::Repository(name.clone()))
            }
        }
    }
}

// ── Tests ──
