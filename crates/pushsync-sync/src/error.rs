use std::time::Duration;

use pushsync_core::ScheduleState;
use pushsync_tracker::TrackerError;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("workspace `{name}` not found ({matches} matches)")]
    WorkspaceNotFound { name: String, matches: usize },

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("repository `{0}` could not be found or created")]
    Repository(String),

    #[error("changeset for {revision} not created: {reason}")]
    Changeset { revision: String, reason: String },

    #[error("{artifact} reported state {actual:?} instead of {expected}")]
    StateMismatch {
        artifact: String,
        expected: ScheduleState,
        actual: Option<String>,
    },

    #[error("push processing exceeded {0:?}")]
    Timeout(Duration),

    #[error("push task failed: {0}")]
    Task(String),
}

