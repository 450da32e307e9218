/// Keyed, individually cancellable timers
///
/// Each key holds at most one armed timer. A timer's completion is only
/// honoured if it carries the token of the timer currently armed for its key,
/// so a completion racing a cancel is dropped.
use std::collections::HashMap;
use std::hash::Hash;

/// Something that can abort a scheduled job
pub trait TimerHandle {
    fn cancel(self);
}

/// Jobs that cannot be aborted; their completions are filtered by token
impl TimerHandle for () {
    fn cancel(self) {}
}

impl TimerHandle for iced::task::Handle {
    fn cancel(self) {
        self.abort();
    }
}

/// Identifies one arming of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Debug)]
pub struct CancellableTimers<K, H> {
    armed: HashMap<K, (TimerToken, H)>,
    next_token: u64,
}

impl<K, H> Default for CancellableTimers<K, H> {
    fn default() -> Self {
        Self {
            armed: HashMap::new(),
            next_token: 0,
        }
    }
}

impl<K: Eq + Hash, H: TimerHandle> CancellableTimers<K, H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer for `key`, cancelling the one already armed there
    pub fn arm(&mut self, key: K, handle: H) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        if let Some((_, previous)) = self.armed.insert(key, (token, handle)) {
            previous.cancel();
        }
        token
    }

    /// Cancel the timer armed for `key`. Returns false if none was armed.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.armed.remove(key) {
            Some((_, handle)) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// A timer completed. Returns true (and disarms) only if `token` is the
    /// live arming for `key`.
    pub fn fire(&mut self, key: &K, token: TimerToken) -> bool {
        match self.armed.get(key) {
            Some((armed, _)) if *armed == token => {
                self.armed.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.armed.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    /// Cancel every armed timer
    pub fn cancel_all(&mut self) {
        for (_, (_, handle)) in self.armed.drain() {
            handle.cancel();
        }
    }
}
