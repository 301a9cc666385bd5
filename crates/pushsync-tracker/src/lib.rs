pub mod client;
pub mod error;
pub mod mock;
pub mod wire;

use pushsync_core::{ArtifactKind, ScheduleState};

pub use client::RallyClient;
pub use error::TrackerError;
pub use mock::{Call, MockTracker};
pub use wire::{
    Collection, CreateResult, NewChange, NewChangeset, NewRepository, OperationResult, Query,
    QueryResult, Reference,
};

/// Outbound operations against the tracker. Implemented by `RallyClient`
/// (HTTP) and `MockTracker` (tests).
///
/// Implementations report what the tracker answered; deciding whether an
/// answer is usable (exactly one result, non-empty reference, echoed state)
/// is left to the caller.
#[async_trait::async_trait]
pub trait Tracker: Send + Sync {
    async fn query(&self, query: &Query) -> Result<QueryResult, TrackerError>;

    async fn create_repository(&self, repo: &NewRepository) -> Result<CreateResult, TrackerError>;

    async fn create_changeset(
        &self,
        changeset: &NewChangeset,
    ) -> Result<CreateResult, TrackerError>;

    async fn create_change(&self, change: &NewChange) -> Result<CreateResult, TrackerError>;

    /// Move the artifact at `artifact_ref` to `state`.
    async fn update_state(
        &self,
        artifact_ref: &str,
        kind: ArtifactKind,
        state: ScheduleState,
    ) -> Result<OperationResult, TrackerError>;
}
