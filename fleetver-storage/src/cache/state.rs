//! Per-environment cache state.

use super::bucket::{self, Allocation};
use super::key::CacheKey;
use chrono::{DateTime, Utc};
use fleetver_core::FleetError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Result of one compute, served to every lookup of its bucket.
pub type Outcome<V> = Result<Arc<V>, FleetError>;

/// A cache slot. Empty while its compute is in flight.
pub type Slot<V> = Arc<OnceCell<Outcome<V>>>;

/// Anchor, entries and display time of one environment.
///
/// Always accessed under the environment's mutex; none of these methods
/// await.
#[derive(Debug)]
pub struct EnvironmentState<V> {
    anchor_time: Option<DateTime<Utc>>,
    entries: HashMap<CacheKey, Slot<V>>,
    display_time: Option<String>,
}

impl<V> Default for EnvironmentState<V> {
    fn default() -> Self {
        Self {
            anchor_time: None,
            entries: HashMap::new(),
            display_time: None,
        }
    }
}

impl<V> EnvironmentState<V> {
    pub fn anchor_time(&self) -> Option<DateTime<Utc>> {
        self.anchor_time
    }

    pub fn display_time(&self) -> Option<&str> {
        self.display_time.as_deref()
    }

    pub fn set_display_time(&mut self, display: impl Into<String>) {
        self.display_time = Some(display.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advance the anchor for `now` and return the current bucket.
    pub fn allocate(&mut self, ttl: Duration, now: DateTime<Utc>) -> Allocation {
        bucket::allocate(&mut self.anchor_time, ttl, now)
    }

    /// Move the anchor forward to `now` and drop every entry.
    ///
    /// Never moves the anchor backwards.
    pub fn restart_at(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let anchor = match self.anchor_time {
            Some(current) if current > now => current,
            _ => now,
        };
        self.anchor_time = Some(anchor);
        self.entries.clear();
        anchor
    }

    /// Drop all entries, keeping the anchor.
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    /// Forget everything, returning to the uninitialised state.
    pub fn reset(&mut self) {
        self.anchor_time = None;
        self.entries.clear();
        self.display_time = None;
    }

    /// Existing slot for `key`, if any.
    pub fn lookup(&self, key: &CacheKey) -> Option<Slot<V>> {
        self.entries.get(key).cloned()
    }

    /// Slot for `key`, inserting an empty one when absent.
    ///
    /// Returns the slot and whether it was inserted by this call.
    pub fn slot_for(&mut self, key: &CacheKey) -> (Slot<V>, bool) {
        if let Some(slot) = self.entries.get(key) {
            return (Arc::clone(slot), false);
        }
        let slot: Slot<V> = Arc::new(OnceCell::new());
        self.entries.insert(key.clone(), Arc::clone(&slot));
        (slot, true)
    }

    /// Evict oldest-bucket entries until at most `max` remain.
    ///
    /// `keep` is never evicted. Returns the evicted keys.
    pub fn evict_over(&mut self, max: usize, keep: &CacheKey) -> Vec<CacheKey> {
        let mut evicted = Vec::new();
        while self.entries.len() > max {
            let oldest = self
                .entries
                .keys()
                .filter(|k| *k != keep)
                .min_by_key(|k| k.bucket())
                .cloned();
            match oldest {
                Some(victim) => {
                    self.entries.remove(&victim);
                    evicted.push(victim);
                }
                None => break,
            }
        }
        evicted
    }

    /// Keys currently held, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.entries.keys()
    }
}
