//! Push-to-tracker synchronization.
//!
//! A push is validated against the configured workspace, then processed in
//! the background: for every commit the referenced artifacts are resolved,
//! their workflow state is advanced when the message asks for it, and a
//! changeset with one change row per touched path is recorded.

pub mod artifacts;
pub mod error;
pub mod orchestrator;
pub mod recorder;
pub mod report;
pub mod transition;
pub mod users;

pub use artifacts::ArtifactResolver;
pub use error::SyncError;
pub use orchestrator::{PushHandle, PushOrchestrator};
pub use recorder::{ChangesetRecorder, PushTarget};
pub use report::{CommitReport, PushReport};
pub use transition::StateTransitioner;
pub use users::UserResolver;
