//! fleetver Storage - Environment-Scoped TTL Cache
//!
//! Fronts expensive per-cluster enumeration with a bounded, time-bucketed
//! cache. Nothing here knows what a deployment is; values are opaque.

pub mod cache;

pub use cache::{
    allocate, Allocation, BoundedTtlCache, BucketFetcher, CacheConfig, CacheKey, CacheRead,
    CacheStats, EnvironmentState, RolloverPolicy,
};
