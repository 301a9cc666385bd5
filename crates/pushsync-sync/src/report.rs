use pushsync_core::ScheduleState;

/// Outcome of recording one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub revision: String,
    /// Identifiers that resolved to a tracker artifact.
    pub artifacts: Vec<String>,
    pub author: Option<String>,
    /// Reference of the created changeset.
    pub changeset: Option<String>,
    /// Why the changeset was not created.
    pub error: Option<String>,
    pub changes_recorded: usize,
    pub changes_failed: usize,
    pub states_applied: Vec<(String, ScheduleState)>,
    pub states_failed: usize,
}

impl CommitReport {
    pub fn new(revision: &str) -> Self {
        Self {
            revision: revision.to_string(),
            ..Default::default()
        }
    }

    /// Changeset created, with no failed change row or state update.
    pub fn is_complete(&self) -> bool {
        self.changeset.is_some() && self.changes_failed == 0 && self.states_failed == 0
    }
}

/// Outcome of the background phase of one push.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub repository: String,
    pub branch: String,
    pub repository_ref: Option<String>,
    pub commits: Vec<CommitReport>,
    /// Set when the push was abandoned before all commits were processed.
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl PushReport {
    pub fn changesets_created(&self) -> usize {
        self.commits.iter().filter(|c| c.changeset.is_some()).count()
    }

    pub fn commits_failed(&self) -> usize {
        self.commits.iter().filter(|c| c.error.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.commits.iter().all(CommitReport::is_complete)
    }
}
