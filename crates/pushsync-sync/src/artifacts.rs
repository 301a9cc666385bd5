use std::collections::BTreeMap;
use std::sync::Arc;

use pushsync_core::{scan_artifacts, ArtifactId};
use pushsync_tracker::{Query, Tracker};
use tracing::{debug, warn};

/// Maps the identifiers mentioned in a commit message to tracker references.
pub struct ArtifactResolver {
    tracker: Arc<dyn Tracker>,
}

impl ArtifactResolver {
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self { tracker }
    }

    /// Resolve every identifier in `message`.
    ///
    /// Identifiers the tracker does not know, and identifiers whose lookup
    /// fails, are left out; one failed lookup never stops the others. An empty
    /// map is a normal result.
    pub async fn resolve(&self, message: &str) -> BTreeMap<ArtifactId, String> {
        let mut resolved = BTreeMap::new();
        for id in scan_artifacts(message) {
            match self.tracker.query(&Query::artifact(&id)).await {
                Ok(result) => match result.first() {
                    Some(reference) => {
                        debug!(artifact = %id, reference, "artifact resolved");
                        resolved.insert(id, reference.to_string());
                    }
                    None => debug!(artifact = %id, "artifact not found in tracker"),
                },
                Err(e) => warn!(artifact = %id, error = %e, "artifact lookup failed"),
            }
        }
        resolved
    }
}

// ── Tests ──
