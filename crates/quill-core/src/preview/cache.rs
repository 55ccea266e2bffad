//! Bounded memo for html to text conversion of action messages.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use quill_types::ReportAction;
use tracing::warn;

/// `(report id, action id, last modified)`. An edit changes the last key part,
/// so stale entries are never returned and simply age out.
pub type PreviewKey = (String, String, String);

pub struct PreviewCache {
    entries: Mutex<LruCache<PreviewKey, String>>,
}

impl PreviewCache {
    /// A zero capacity is raised to one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn key(report_id: &str, action: &ReportAction) -> PreviewKey {
        (
            report_id.to_string(),
            action.report_action_id.clone(),
            action.last_modified.clone().unwrap_or_default(),
        )
    }

    /// Returns the cached text or computes and stores it. A poisoned lock
    /// degrades to computing without the cache.
    pub fn get_or_insert_with(&self, key: PreviewKey, compute: impl FnOnce() -> String) -> String {
        let Ok(mut entries) = self.entries.lock() else {
            warn!("Preview cache lock poisoned, computing uncached");
            return compute();
        };
        if let Some(text) = entries.get(&key) {
            return text.clone();
        }
        let text = compute();
        entries.put(key, text.clone());
        text
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}
