pub mod artifact;
pub mod config;
pub mod keyword;
pub mod push;

pub use artifact::{scan_artifacts, ArtifactId, ArtifactKind};
pub use config::{Config, ConfigError};
pub use keyword::{scan_signals, target_state, ScheduleState, Signal};
pub use push::{blob_url, ChangeAction, Commit, Identity, PushEvent, Repository};
