//! Environment-scoped result cache.
//!
//! Values are keyed by `(resource, bucket)` inside one environment. The
//! bucket is a quantized timestamp: every lookup inside one TTL window of an
//! environment lands in the same bucket, so an expensive enumeration runs at
//! most once per cluster per window.
//!
//! # Example
//!
//! ```ignore
//! let cache = BoundedTtlCache::with_system_clock(CacheConfig::from(&fleet_config));
//!
//! let read = cache.get_or_compute("eks-dev-1", "dev", &fetcher).await?;
//! if read.was_cache_hit() {
//!     tracing::trace!(bucket = %read.bucket(), "served from cache");
//! }
//! ```

pub mod bounded;
pub mod bucket;
pub mod key;
pub mod provenance;
pub mod state;
pub mod stats;

pub use bounded::{BoundedTtlCache, BucketFetcher, CacheConfig, RolloverPolicy};
pub use bucket::{allocate, Allocation};
pub use key::CacheKey;
pub use provenance::CacheRead;
pub use state::EnvironmentState;
pub use stats::CacheStats;
