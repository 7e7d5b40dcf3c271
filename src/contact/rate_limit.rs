//! Fixed-window rate limiting for contact submissions
//!
//! The limiter only decides; counting lives behind [`RateLimitStore`] so a
//! shared store can replace the in-process map in a multi-instance deployment.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Counter state for one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at: Instant,
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Storage for per-key counters
pub trait RateLimitStore: Send + Sync {
    /// Check `key` against `max` and count the hit if allowed, as one atomic
    /// step. Opens a new window when none is active. Limited hits are not
    /// counted.
    fn try_hit(&self, key: &str, now: Instant, window: Duration, max: u32) -> Decision;

    /// Drop expired entries, returning how many were removed
    fn sweep(&self, now: Instant) -> usize;
}

/// Process-local store, correct for a single instance only
#[derive(Debug, Default)]
pub struct MemoryRateLimitStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |e| e.len())
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.lock().ok()?.get(key).copied()
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn try_hit(&self, key: &str, now: Instant, window: Duration, max: u32) -> Decision {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let entry = entries
            .entry(key.to_string())
            .and_modify(|e| {
                if e.reset_at <= now {
                    *e = RateLimitEntry {
                        count: 0,
                        reset_at: now + window,
                    };
                }
            })
            .or_insert(RateLimitEntry {
                count: 0,
                reset_at: now + window,
            });

        if entry.count >= max {
            return Decision::Limited {
                retry_after: entry.reset_at.saturating_duration_since(now),
            };
        }
        entry.count = entry.count.saturating_add(1);
        Decision::Allowed {
            remaining: max.saturating_sub(entry.count),
        }
    }

    fn sweep(&self, now: Instant) -> usize {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, e| e.reset_at > now);
        before - entries.len()
    }
}

/// Allows `max` hits per `window` for each key
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    window: Duration,
    max: u32,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, window: Duration, max: u32) -> Self {
        Self { store, window, max }
    }

    /// In-memory limiter
    pub fn in_memory(window: Duration, max: u32) -> Self {
        Self::new(Arc::new(MemoryRateLimitStore::new()), window, max)
    }

    /// Check and count a hit at `now`. Hits over the limit are not counted,
    /// so a blocked client cannot push its own window further out.
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        self.store.try_hit(key, now, self.window, self.max)
    }

    pub fn sweep(&self, now: Instant) -> usize {
        self.store.sweep(now)
    }
}
