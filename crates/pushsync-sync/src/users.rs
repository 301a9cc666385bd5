use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pushsync_tracker::{Query, Tracker};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

type Entry = Arc<OnceCell<Option<String>>>;

/// Resolves commit author emails to tracker user references.
///
/// Every email is looked up at most once for the lifetime of the resolver,
/// also when several pushes ask for it at the same moment. A miss (zero or
/// several users, or a failed lookup) is remembered as `None` and never
/// retried.
pub struct UserResolver {
    tracker: Arc<dyn Tracker>,
    cache: Mutex<HashMap<String, Entry>>,
}

impl UserResolver {
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self {
            tracker,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, email: &str) -> Option<String> {
        if email.is_empty() {
            return None;
        }
        let entry = self.entry(email);
        entry
            .get_or_init(|| self.lookup(email))
            .await
            .clone()
    }

    /// Cached answer for `email`: `None` when never looked up.
    pub fn cached(&self, email: &str) -> Option<Option<String>> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.get(email).and_then(|entry| entry.get().cloned())
    }

    fn entry(&self, email: &str) -> Entry {
        // Lock is released before the lookup is awaited.
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.entry(email.to_string()).or_default().clone()
    }

    async fn lookup(&self, email: &str) -> Option<String> {
        match self.tracker.query(&Query::user(email)).await {
            Ok(result) => {
                let found = result.single().map(str::to_string);
                match &found {
                    Some(reference) => debug!(email, reference, "author resolved"),
                    None => warn!(
                        email,
                        matches = result.results.len(),
                        "author has no unique tracker user"
                    ),
                }
                found
            }
            Err(e) => {
                warn!(email, error = %e, "author lookup failed");
                None
            }
        }
    }
}

// ── Tests ──
