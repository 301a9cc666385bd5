use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Service configuration, read from a JSON file (`config.json` by default).
/// Key names match the files already deployed alongside the webhook.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Tracker base URL; the REST root is `{tracker_url}/slm/webservice/v2.0`.
    #[serde(rename = "rally-url")]
    pub tracker_url: String,
    /// Opaque token attached to every tracker request.
    #[serde(rename = "api-key")]
    pub api_key: String,
    pub workspace: String,
    /// Shared secret for webhook payload signatures.
    #[serde(default)]
    pub secret_token: String,
    #[serde(default)]
    pub signature_required: bool,
    #[serde(default = "default_max_concurrent_pushes")]
    pub max_concurrent_pushes: usize,
    #[serde(default = "default_push_timeout_secs")]
    pub push_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

pub const DEFAULT_MAX_CONCURRENT_PUSHES: usize = 8;
pub const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 600;

fn default_max_concurrent_pushes() -> usize {
    DEFAULT_MAX_CONCURRENT_PUSHES
}

fn default_push_timeout_secs() -> u64 {
    DEFAULT_PUSH_TIMEOUT_SECS
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Read, parse and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("rally-url", &self.tracker_url),
            ("api-key", &self.api_key),
            ("workspace", &self.workspace),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("`{key}` must not be empty")));
            }
        }
        if self.signature_required && self.secret_token.is_empty() {
            return Err(ConfigError::Invalid(
                "`signature_required` is set but `secret_token` is empty".into(),
            ));
        }
        if self.max_concurrent_pushes == 0 {
            return Err(ConfigError::Invalid(
                "`max_concurrent_pushes` must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("tracker_url", &self.tracker_url)
            .field("api_key", &"[REDACTED]")
            .field("workspace", &self.workspace)
            .field("secret_token", &"[REDACTED]")
            .field("signature_required", &self.signature_required)
            .field("max_concurrent_pushes", &self.max_concurrent_pushes)
            .field("push_timeout_secs", &self.push_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

// ── Tests ──
