//! Per-client request throttling
//!
//! Tick sources report once a second per tab; a client flooding the daemon
//! far beyond that is either broken or trying to burn through its budget
//! from outside the poller.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::ClientId;

/// Fixed-window request counter keyed by client.
#[derive(Debug)]
pub struct RateLimiter<K = ClientId> {
    max_requests: u32,
    window: Duration,
    windows: HashMap<K, Window>,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    used: u32,
}

impl<K: Hash + Eq + Clone> RateLimiter<K> {
    /// Allow at most `max_requests` per `window` for each key.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: HashMap::new(),
        }
    }

    /// Record a request; returns `false` when the key is over its limit.
    pub fn check(&mut self, key: &K) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&mut self, key: &K, now: Instant) -> bool {
        let window = self.windows.entry(key.clone()).or_insert(Window {
            started: now,
            used: 0,
        });

        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.used = 0;
        }

        if window.used < self.max_requests {
            window.used += 1;
            true
        } else {
            false
        }
    }

    /// Forget a key, e.g. when its client disconnects.
    pub fn remove(&mut self, key: &K) {
        self.windows.remove(key);
    }

    /// Drop keys that have not been seen for `idle`.
    pub fn prune(&mut self, idle: Duration) {
        let now = Instant::now();
        self.windows
            .retain(|_, window| now.duration_since(window.started) < idle);
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
