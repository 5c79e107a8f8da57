//! Per-reference cooldown suppressing repeat announcements.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tracks when each canonical reference was last surfaced and refuses
/// re-admission inside the cooldown window.
#[derive(Debug)]
pub struct CooldownCache {
    entries: HashMap<String, Instant>,
    window: Duration,
    prune_threshold: usize,
}

impl CooldownCache {
    pub fn new(window: Duration, prune_threshold: usize) -> Self {
        Self {
            entries: HashMap::new(),
            window,
            prune_threshold,
        }
    }

    /// Admits `key` if it has not been seen within the window, recording
    /// `now` as its new timestamp. Returns false when suppressed.
    pub fn try_admit_at(&mut self, key: &str, now: Instant) -> bool {
        if let Some(last) = self.entries.get(key) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }
        self.entries.insert(key.to_string(), now);
        if self.entries.len() > self.prune_threshold {
            let window = self.window;
            self.entries
                .retain(|_, last| now.saturating_duration_since(*last) < window);
        }
        true
    }

    pub fn try_admit(&mut self, key: &str) -> bool {
        self.try_admit_at(key, Instant::now())
    }

    /// Drops all history, e.g. when a new capture session begins.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
