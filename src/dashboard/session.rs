use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::analysis::AnalysisResult;

/// Per-session cache of the most recent analysis.
///
/// The raw and analyzed pages are served from here so they can be revisited
/// without re-scraping, and two users querying different events concurrently
/// never see each other's tables. A newer analysis for the same session
/// supersedes the old one; when the cache exceeds its bound the oldest entry
/// by computation time is evicted.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Arc<AnalysisResult>>>>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        SessionStore {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_sessions,
        }
    }

    /// Generate a fresh session token.
    pub fn new_token() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    }

    pub fn insert(&self, token: &str, result: Arc<AnalysisResult>) {
        let mut map = self.inner.lock().expect("session store poisoned");
        map.insert(token.to_string(), result);
        if map.len() > self.max_sessions {
            let oldest = map
                .iter()
                .min_by_key(|(_, r)| r.computed_at)
                .map(|(k, _)| k.clone());
            if let Some(k) = oldest {
                map.remove(&k);
            }
        }
    }

    pub fn get(&self, token: &str) -> Option<Arc<AnalysisResult>> {
        self.inner
            .lock()
            .expect("session store poisoned")
            .get(token)
            .cloned()
    }

    pub fn remove(&self, token: &str) {
        self.inner
            .lock()
            .expect("session store poisoned")
            .remove(token);
    }
}
