/// Hover-to-preview for media cards
///
/// Hovering a card for `delay` resolves its playable source (a catalog
/// lookup) and activates the inline preview. Leaving the card before the delay
/// cancels the lookup entirely.
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use super::timer::{CancellableTimers, TimerHandle, TimerToken};

/// What the caller must do after a hover starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverStart {
    /// A source was cached; the item is now active
    Activated,
    /// Arm a timer for the preview delay and report back via `timer_elapsed`
    Debounce,
}

/// A source lookup the caller must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub id: String,
}

#[derive(Debug, Clone)]
struct ResolvedSource {
    url: String,
    resolved_at: Instant,
}

#[derive(Debug)]
pub struct HoverPreview<H> {
    delay: Duration,
    ttl: Duration,
    timers: CancellableTimers<String, H>,
    sources: HashMap<String, ResolvedSource>,
    /// Lookups issued and not answered yet
    resolving: HashSet<String>,
    /// Items that resolved a source at least once
    ready: HashSet<String>,
    hovered: Option<String>,
    active: Option<String>,
}

impl<H: TimerHandle> HoverPreview<H> {
    pub fn new(delay: Duration, ttl: Duration) -> Self {
        Self {
            delay,
            ttl,
            timers: CancellableTimers::new(),
            sources: HashMap::new(),
            resolving: HashSet::new(),
            ready: HashSet::new(),
            hovered: None,
            active: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn fresh_source(&self, id: &str, now: Instant) -> Option<&str> {
        self.sources
            .get(id)
            .filter(|source| now.duration_since(source.resolved_at) < self.ttl)
            .map(|source| source.url.as_str())
    }

    /// The pointer entered an item
    pub fn hover_start(&mut self, id: &str, now: Instant) -> HoverStart {
        self.hovered = Some(id.to_string());
        if self.fresh_source(id, now).is_some() {
            self.active = Some(id.to_string());
            return HoverStart::Activated;
        }
        HoverStart::Debounce
    }

    /// Register the debounce timer for `id`, replacing any earlier one
    pub fn arm(&mut self, id: &str, handle: H) -> TimerToken {
        self.timers.arm(id.to_string(), handle)
    }

    /// The pointer left an item
    pub fn hover_end(&mut self, id: &str) {
        self.timers.cancel(&id.to_string());
        if self.hovered.as_deref() == Some(id) {
            self.hovered = None;
        }
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
    }

    /// A debounce timer completed. Stale or cancelled timers are ignored.
    pub fn timer_elapsed(
        &mut self,
        id: &str,
        token: TimerToken,
        now: Instant,
    ) -> Option<ResolveRequest> {
        if !self.timers.fire(&id.to_string(), token) {
            return None;
        }
        if self.fresh_source(id, now).is_some() {
            self.activate_if_hovered(id);
            return None;
        }
        self.begin_resolve(id)
    }

    /// Make sure a source is (being) resolved for `id` without hovering
    pub fn request_source(&mut self, id: &str, now: Instant) -> Option<ResolveRequest> {
        if self.fresh_source(id, now).is_some() {
            return None;
        }
        self.begin_resolve(id)
    }

    fn begin_resolve(&mut self, id: &str) -> Option<ResolveRequest> {
        if !self.resolving.insert(id.to_string()) {
            log::debug!("source lookup for {id} already in flight");
            return None;
        }
        Some(ResolveRequest { id: id.to_string() })
    }

    /// A lookup finished with the playable source (None when the item has
    /// none). Returns true when the item became active.
    pub fn source_resolved(&mut self, id: &str, source: Option<String>, now: Instant) -> bool {
        self.resolving.remove(id);
        let Some(url) = source else {
            return false;
        };

        self.sources.insert(
            id.to_string(),
            ResolvedSource {
                url,
                resolved_at: now,
            },
        );
        self.ready.insert(id.to_string());
        self.activate_if_hovered(id)
    }

    /// A lookup failed; hovering again retries
    pub fn source_failed(&mut self, id: &str) {
        self.resolving.remove(id);
    }

    fn activate_if_hovered(&mut self, id: &str) -> bool {
        if self.hovered.as_deref() == Some(id) {
            self.active = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Last resolved source for `id`, fresh or not
    pub fn source(&self, id: &str) -> Option<&str> {
        self.sources.get(id).map(|source| source.url.as_str())
    }

    /// A lookup for `id` was issued and has not been answered
    pub fn is_resolving(&self, id: &str) -> bool {
        self.resolving.contains(id)
    }

    pub fn is_ready(&self, id: &str) -> bool {
        self.ready.contains(id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.as_deref() == Some(id)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Cancel every outstanding timer and deactivate
    pub fn teardown(&mut self) {
        self.timers.cancel_all();
        self.hovered = None;
        self.active = None;
    }
}
