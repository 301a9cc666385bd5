use std::sync::Arc;

use pushsync_core::{target_state, ArtifactId, ScheduleState};
use pushsync_tracker::Tracker;
use tracing::info;

use crate::error::SyncError;

/// Moves artifacts along their workflow when a commit message says so.
pub struct StateTransitioner {
    tracker: Arc<dyn Tracker>,
}

impl StateTransitioner {
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self { tracker }
    }

    /// Apply the state `message` asks for on `id`, whose tracker reference is
    /// `artifact_ref`. Returns `Ok(None)` without calling the tracker when the
    /// message has no keyword for this identifier.
    ///
    /// The update only counts when the tracker reports the requested state back.
    pub async fn apply(
        &self,
        message: &str,
        id: &ArtifactId,
        artifact_ref: &str,
    ) -> Result<Option<ScheduleState>, SyncError> {
        let Some(state) = target_state(message, id) else {
            return Ok(None);
        };

        let result = self
            .tracker
            .update_state(artifact_ref, id.kind(), state)
            .await?;

        match result.schedule_state() {
            Some(reported) if reported == state.as_str() => {
                info!(artifact = %id, state = %state, "artifact state updated");
                Ok(Some(state))
            }
            reported => Err(SyncError::StateMismatch {
                artifact: id.to_string(),
                expected: state,
                actual: reported.map(str::to_string),
            }),
        }
    }
}

// ── Tests ──
