//! Read provenance for cache lookups.
//!
//! Every lookup returns a [`CacheRead<T>`] telling the caller which bucket
//! served it and whether the compute function ran for this call.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Result of a cache read, carrying bucket metadata.
#[derive(Debug)]
pub struct CacheRead<T> {
    /// The cached value, shared with the cache entry.
    value: Arc<T>,
    /// The bucket the value belongs to.
    bucket: DateTime<Utc>,
    /// Whether this was a cache hit or miss.
    was_cache_hit: bool,
}

impl<T> Clone for CacheRead<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            bucket: self.bucket,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> CacheRead<T> {
    /// A read served from an existing entry.
    pub fn from_cache(value: Arc<T>, bucket: DateTime<Utc>) -> Self {
        Self {
            value,
            bucket,
            was_cache_hit: true,
        }
    }

    /// A read that ran the compute function.
    pub fn from_compute(value: Arc<T>, bucket: DateTime<Utc>) -> Self {
        Self {
            value,
            bucket,
            was_cache_hit: false,
        }
    }

    /// Consume the wrapper and return the shared value.
    pub fn into_value(self) -> Arc<T> {
        self.value
    }

    /// Get a reference to the value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Get the shared handle without consuming the read.
    pub fn shared(&self) -> &Arc<T> {
        &self.value
    }

    pub fn bucket(&self) -> DateTime<Utc> {
        self.bucket
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Age of the bucket relative to `now`; zero if `now` precedes it.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.bucket)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_read_from_cache() {
        let bucket = Utc::now();
        let read = CacheRead::from_cache(Arc::new("snapshot".to_string()), bucket);

        assert!(read.was_cache_hit());
        assert!(!read.was_cache_miss());
        assert_eq!(read.value(), "snapshot");
        assert_eq!(read.bucket(), bucket);
    }

    #[test]
    fn test_cache_read_from_compute() {
        let read = CacheRead::from_compute(Arc::new(42i32), Utc::now());
        assert!(read.was_cache_miss());
        assert_eq!(*read.into_value(), 42);
    }

    #[test]
    fn test_clone_shares_value() {
        let read = CacheRead::from_compute(Arc::new(vec![1, 2, 3]), Utc::now());
        let copy = read.clone();
        assert!(Arc::ptr_eq(read.shared(), copy.shared()));
    }

    #[test]
    fn test_age() {
        let past = Utc::now() - chrono::Duration::seconds(5);
        let read = CacheRead::from_cache(Arc::new(()), past);

        let age = read.age(Utc::now());
        assert!(age >= Duration::from_secs(4));
        assert!(age <= Duration::from_secs(10));
        assert_eq!(read.age(past - chrono::Duration::seconds(1)), Duration::ZERO);
    }
}
