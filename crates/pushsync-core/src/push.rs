use serde::{Deserialize, Serialize};

// ── Payload ──

/// The subset of a GitHub push webhook payload that the sync engine reads.
/// Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub commits: Vec<Commit>,
    pub repository: Repository,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub author: Identity,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

impl PushEvent {
    /// Branch name from the pushed ref: `refs/heads/feature/x` → `feature/x`.
    /// Tag refs lose their `refs/tags/` prefix; anything else is returned as-is.
    pub fn branch(&self) -> &str {
        self.git_ref
            .strip_prefix("refs/heads/")
            .or_else(|| self.git_ref.strip_prefix("refs/tags/"))
            .unwrap_or(&self.git_ref)
    }
}

// ── Changes ──

/// File-level delta kind, encoded as the single-letter action the tracker expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeAction {
    #[serde(rename = "A")]
    Added,
    #[serde(rename = "M")]
    Modified,
    #[serde(rename = "R")]
    Removed,
}

impl ChangeAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::Added => "A",
            ChangeAction::Modified => "M",
            ChangeAction::Removed => "R",
        }
    }
}

impl Commit {
    /// Web URL of this commit under the repository URL.
    pub fn web_url(&self, repo_url: &str) -> String {
        format!("{}/commit/{}", repo_url.trim_end_matches('/'), self.id)
    }

    /// Every touched path with its action: added first, then modified, then removed.
    pub fn changes(&self) -> impl Iterator<Item = (ChangeAction, &str)> + '_ {
        let added = self.added.iter().map(|p| (ChangeAction::Added, p.as_str()));
        let modified = self
            .modified
            .iter()
            .map(|p| (ChangeAction::Modified, p.as_str()));
        let removed = self
            .removed
            .iter()
            .map(|p| (ChangeAction::Removed, p.as_str()));
        added.chain(modified).chain(removed)
    }

    pub fn change_count(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }
}

/// Blob URL for a path on a branch: `repository-url/blob/branch/path`.
pub fn blob_url(repo_url: &str, branch: &str, path: &str) -> String {
    format!("{}/blob/{branch}/{path}", repo_url.trim_end_matches('/'))
}

// ── Tests ──
