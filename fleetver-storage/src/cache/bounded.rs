//! Environment-scoped, time-bucketed get-or-compute cache.
//!
//! Lookups name a resource (a cluster) and an environment. The environment's
//! anchor decides which bucket "now" belongs to; the outcome for
//! `(resource, bucket)` is computed at most once and shared by every caller
//! in that bucket. A failed compute is an outcome too: it is served until
//! the bucket rolls over or the environment is cleared.
//!
//! # Locking
//!
//! Environments are striped across a `DashMap`. Each environment's anchor,
//! entries and display time sit behind one `std::sync::Mutex` that is only
//! held for bookkeeping, never across an `.await`. The compute itself runs
//! inside the entry's `OnceCell`, so concurrent misses for one key wait for
//! a single computation instead of racing.

use super::key::CacheKey;
use super::provenance::CacheRead;
use super::state::EnvironmentState;
use super::stats::{CacheStats, StatCounters};
use super::bucket;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fleetver_core::config::DEFAULT_TTL_SECS;
use fleetver_core::{format_display_time, Clock, FleetConfig, FleetResult, SystemClock};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, trace};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// What happens to older entries when an environment's anchor advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RolloverPolicy {
    /// Keep them; the entry cap and the stale flush bound memory.
    #[default]
    Retain,
    /// Drop every entry of the environment on rollover.
    Flush,
}

/// Configuration for the bounded TTL cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries to cache per environment.
    pub max_entries_per_environment: usize,
    /// TTL for environments without an explicit one.
    pub default_ttl: Duration,
    /// Per-environment TTLs.
    pub environment_ttls: HashMap<String, Duration>,
    /// Rollover behaviour.
    pub rollover: RolloverPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries_per_environment: fleetver_core::config::DEFAULT_MAX_ENTRIES,
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            environment_ttls: HashMap::new(),
            rollover: RolloverPolicy::Retain,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the max entries per environment. Zero is raised to one.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries_per_environment = max.max(1);
        self
    }

    /// Set the TTL used for environments without their own.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the TTL of one environment.
    pub fn with_environment_ttl(mut self, env: impl Into<String>, ttl: Duration) -> Self {
        self.environment_ttls.insert(env.into(), ttl);
        self
    }

    /// Set the rollover policy.
    pub fn with_rollover(mut self, policy: RolloverPolicy) -> Self {
        self.rollover = policy;
        self
    }

    /// TTL for `env`.
    pub fn ttl_for(&self, env: &str) -> Duration {
        self.environment_ttls
            .get(env)
            .copied()
            .unwrap_or(self.default_ttl)
    }
}

impl From<&FleetConfig> for CacheConfig {
    fn from(config: &FleetConfig) -> Self {
        Self {
            max_entries_per_environment: config.max_entries_per_environment.max(1),
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            environment_ttls: config
                .environments
                .iter()
                .map(|(name, env)| (name.clone(), env.ttl()))
                .collect(),
            rollover: RolloverPolicy::Retain,
        }
    }
}

// ============================================================================
// COMPUTE SEAM
// ============================================================================

/// Computes the value for one resource in one bucket on a cache miss.
#[async_trait]
pub trait BucketFetcher<V>: Send + Sync {
    /// Produce the value for `resource_id` in `env_id` at `bucket`.
    async fn fetch(&self, resource_id: &str, env_id: &str, bucket: DateTime<Utc>) -> FleetResult<V>;
}

// ============================================================================
// CACHE
// ============================================================================

#[derive(Debug)]
struct EnvironmentHandle<V> {
    state: Mutex<EnvironmentState<V>>,
    counters: StatCounters,
}

impl<V> Default for EnvironmentHandle<V> {
    fn default() -> Self {
        Self {
            state: Mutex::new(EnvironmentState::default()),
            counters: StatCounters::default(),
        }
    }
}

impl<V> EnvironmentHandle<V> {
    fn lock(&self) -> MutexGuard<'_, EnvironmentState<V>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Bounded, time-bucketed cache keyed by `(resource, bucket)` per environment.
#[derive(Debug)]
pub struct BoundedTtlCache<V> {
    environments: DashMap<String, Arc<EnvironmentHandle<V>>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl<V> BoundedTtlCache<V>
where
    V: Send + Sync + 'static,
{
    /// Create a cache reading time from `clock`.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            environments: DashMap::new(),
            config,
            clock,
        }
    }

    /// Create a cache on the system clock.
    pub fn with_system_clock(config: CacheConfig) -> Self {
        Self::new(config, Arc::new(SystemClock))
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn handle(&self, env: &str) -> Arc<EnvironmentHandle<V>> {
        if let Some(handle) = self.environments.get(env) {
            return Arc::clone(handle.value());
        }
        Arc::clone(self.environments.entry(env.to_string()).or_default().value())
    }

    /// Current bucket for `env`, rolling the anchor forward as needed.
    ///
    /// Flushes the environment when the bucket is already past its window.
    fn resolve(
        &self,
        env: &str,
        state: &mut EnvironmentState<V>,
        counters: &StatCounters,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let ttl = self.config.ttl_for(env);
        let allocation = state.allocate(ttl, now);
        let mut current = allocation.bucket;

        if allocation.advanced {
            if self.config.rollover == RolloverPolicy::Flush && !state.is_empty() {
                state.flush();
                counters.flushed();
                debug!(env = %env, bucket = %current, "Rollover flushed environment");
            }
            state.set_display_time(format_display_time(now));
        }

        // Quantized allocation keeps `now - bucket` under the TTL, so this
        // only fires if the anchor was left behind some other way.
        if bucket::is_stale(current, ttl, now) {
            current = state.restart_at(now);
            state.set_display_time(format_display_time(now));
            counters.flushed();
            debug!(env = %env, bucket = %current, "Stale bucket, flushed environment");
        }

        current
    }

    /// Current bucket for `env`.
    pub fn bucket(&self, env: &str) -> DateTime<Utc> {
        let handle = self.handle(env);
        let now = self.clock.now();
        let mut state = handle.lock();
        self.resolve(env, &mut state, &handle.counters, now)
    }

    /// Return the value for `resource_id` in the current bucket of `env_id`,
    /// computing it through `fetcher` on a miss.
    pub async fn get_or_compute<F>(
        &self,
        resource_id: &str,
        env_id: &str,
        fetcher: &F,
    ) -> FleetResult<CacheRead<V>>
    where
        F: BucketFetcher<V> + ?Sized,
    {
        self.get_or_compute_with(resource_id, env_id, |bucket| {
            fetcher.fetch(resource_id, env_id, bucket)
        })
        .await
    }

    /// Like [`get_or_compute`](Self::get_or_compute) with a closure
    /// receiving the bucket.
    ///
    /// A failure is cached like a value: later lookups in the same bucket
    /// get the same error without computing again.
    pub async fn get_or_compute_with<F, Fut>(
        &self,
        resource_id: &str,
        env_id: &str,
        compute: F,
    ) -> FleetResult<CacheRead<V>>
    where
        F: FnOnce(DateTime<Utc>) -> Fut,
        Fut: Future<Output = FleetResult<V>>,
    {
        let handle = self.handle(env_id);
        let now = self.clock.now();

        let (key, slot) = {
            let mut state = handle.lock();
            let current = self.resolve(env_id, &mut state, &handle.counters, now);
            let key = CacheKey::new(resource_id, current);
            let (slot, inserted) = state.slot_for(&key);
            if inserted {
                let evicted = state.evict_over(self.config.max_entries_per_environment, &key);
                if !evicted.is_empty() {
                    handle.counters.evicted(evicted.len() as u64);
                    for victim in &evicted {
                        debug!(env = %env_id, key = %victim, "Evicted oldest cache entry");
                    }
                }
            }
            (key, slot)
        };

        let computed = AtomicBool::new(false);
        let bucket = key.bucket();
        let outcome = slot
            .get_or_init(|| {
                computed.store(true, Ordering::Relaxed);
                debug!(env = %env_id, cluster = %resource_id, bucket = %bucket, "Cache miss, computing");
                let pending = compute(bucket);
                async move { pending.await.map(Arc::new) }
            })
            .await;

        match (outcome, computed.load(Ordering::Relaxed)) {
            (Ok(value), true) => {
                handle.counters.miss();
                handle.counters.computed();
                Ok(CacheRead::from_compute(Arc::clone(value), bucket))
            }
            (Ok(value), false) => {
                handle.counters.hit();
                trace!(env = %env_id, key = %key, "Cache hit");
                Ok(CacheRead::from_cache(Arc::clone(value), bucket))
            }
            (Err(e), true) => {
                handle.counters.miss();
                handle.counters.failed();
                debug!(env = %env_id, cluster = %resource_id, bucket = %bucket, error = %e, "Compute failed, cached for bucket");
                Err(e.clone())
            }
            (Err(e), false) => {
                handle.counters.hit();
                trace!(env = %env_id, key = %key, "Cached failure");
                Err(e.clone())
            }
        }
    }

    /// Drop all state of `env`. Returns the number of entries removed.
    pub fn clear(&self, env: &str) -> usize {
        let Some(handle) = self.environments.get(env).map(|h| Arc::clone(h.value())) else {
            return 0;
        };
        let mut state = handle.lock();
        let removed = state.len();
        state.reset();
        debug!(env = %env, removed, "Cleared environment cache");
        removed
    }

    /// Drop the state of every environment. Returns the number of entries removed.
    pub fn clear_all(&self) -> usize {
        let handles: Vec<_> = self
            .environments
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let removed = handles
            .iter()
            .map(|handle| {
                let mut state = handle.lock();
                let n = state.len();
                state.reset();
                n
            })
            .sum();
        debug!(removed, "Cleared all environment caches");
        removed
    }

    /// Provenance string stamped at the last rollover of `env`.
    pub fn display_time(&self, env: &str) -> Option<String> {
        let handle = self.environments.get(env).map(|h| Arc::clone(h.value()))?;
        let state = handle.lock();
        state.display_time().map(str::to_string)
    }

    /// Overwrite the provenance string of `env`.
    pub fn set_display_time(&self, env: &str, display: impl Into<String>) {
        let handle = self.handle(env);
        handle.lock().set_display_time(display);
    }

    /// Number of entries held for `env`.
    pub fn entry_count(&self, env: &str) -> usize {
        self.environments
            .get(env)
            .map(|h| Arc::clone(h.value()))
            .map_or(0, |handle| handle.lock().len())
    }

    /// Statistics of one environment.
    pub fn stats(&self, env: &str) -> CacheStats {
        match self.environments.get(env).map(|h| Arc::clone(h.value())) {
            Some(handle) => {
                let count = handle.lock().len();
                handle.counters.snapshot(count)
            }
            None => CacheStats::default(),
        }
    }

    /// Statistics of every environment seen so far, sorted by name.
    pub fn all_stats(&self) -> BTreeMap<String, CacheStats> {
        let handles: Vec<_> = self
            .environments
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        handles
            .into_iter()
            .map(|(env, handle)| {
                let count = handle.lock().len();
                (env, handle.counters.snapshot(count))
            })
            .collect()
    }
}
