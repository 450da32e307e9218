/// Session-wide record of which cover images finished loading
///
/// Cards are mounted and unmounted as the window moves. The cache outlives
/// them, so a card coming back into view shows its cover straight away instead
/// of replaying the loading skeleton. A cover that failed is not asked for
/// again until [`ImageLoadCache::retry`] clears it.
use std::collections::{HashMap, HashSet};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub url: String,
    /// Never reverts to false within a session
    pub loaded: bool,
    pub timestamp: Instant,
}

#[derive(Debug, Default)]
pub struct ImageLoadCache {
    entries: HashMap<String, CacheEntry>,
    /// URLs whose load has been issued but not finished
    pending: HashSet<String>,
    /// URLs whose load failed this session
    failed: HashSet<String>,
}

impl ImageLoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `url` finished loading. Idempotent.
    pub fn mark_loaded(&mut self, url: &str) {
        self.pending.remove(url);
        self.failed.remove(url);
        self.entries.insert(
            url.to_string(),
            CacheEntry {
                url: url.to_string(),
                loaded: true,
                timestamp: Instant::now(),
            },
        );
    }

    pub fn is_loaded(&self, url: &str) -> bool {
        self.entries.get(url).is_some_and(|entry| entry.loaded)
    }

    pub fn is_pending(&self, url: &str) -> bool {
        self.pending.contains(url)
    }

    pub fn has_failed(&self, url: &str) -> bool {
        self.failed.contains(url)
    }

    /// Claim the load of `url`. Returns true when the caller must issue it;
    /// false when it is already loaded, in progress or failed.
    pub fn preload(&mut self, url: &str) -> bool {
        if self.is_loaded(url) || self.pending.contains(url) || self.failed.contains(url) {
            return false;
        }
        self.pending.insert(url.to_string());
        true
    }

    /// Claim a batch of loads, returning only the URLs the caller must issue
    pub fn preload_batch<'a, I>(&mut self, urls: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        urls.into_iter()
            .filter(|url| self.preload(url))
            .map(str::to_string)
            .collect()
    }

    /// A load failed. Later preloads skip `url` until it is retried.
    pub fn load_failed(&mut self, url: &str) {
        self.pending.remove(url);
        if !self.is_loaded(url) {
            self.failed.insert(url.to_string());
        }
    }

    /// Let the next preload of `url` try again. Returns false when it had
    /// not failed.
    pub fn retry(&mut self, url: &str) -> bool {
        self.failed.remove(url)
    }

    pub fn loaded_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.loaded).count()
    }
}
