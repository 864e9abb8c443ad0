//! Cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time statistics for one environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of compute calls that produced a value.
    pub computes: u64,
    /// Number of compute calls that failed.
    pub failures: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
    /// Number of whole-environment flushes caused by stale buckets or rollover.
    pub stale_flushes: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Sum two snapshots, e.g. to report totals across environments.
    pub fn merge(self, other: CacheStats) -> CacheStats {
        CacheStats {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            computes: self.computes + other.computes,
            failures: self.failures + other.failures,
            evictions: self.evictions + other.evictions,
            stale_flushes: self.stale_flushes + other.stale_flushes,
            entry_count: self.entry_count + other.entry_count,
        }
    }
}

/// Live counters, updated without taking the environment lock.
#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    computes: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
    stale_flushes: AtomicU64,
}

impl StatCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn computed(&self) {
        self.computes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn evicted(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn flushed(&self) {
        self.stale_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entry_count: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computes: self.computes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            stale_flushes: self.stale_flushes.load(Ordering::Relaxed),
            entry_count: entry_count as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_cache_stats_hit_rate_zero() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = StatCounters::default();
        counters.hit();
        counters.hit();
        counters.miss();
        counters.computed();
        counters.evicted(3);
        counters.flushed();

        let stats = counters.snapshot(5);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.computes, 1);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.evictions, 3);
        assert_eq!(stats.stale_flushes, 1);
        assert_eq!(stats.entry_count, 5);
    }

    #[test]
    fn test_merge() {
        let a = CacheStats {
            hits: 1,
            entry_count: 2,
            ..Default::default()
        };
        let b = CacheStats {
            hits: 3,
            misses: 4,
            entry_count: 1,
            ..Default::default()
        };
        let total = a.merge(b);
        assert_eq!(total.hits, 4);
        assert_eq!(total.misses, 4);
        assert_eq!(total.entry_count, 3);
    }
}
