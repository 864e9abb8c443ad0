//! Bucket-scoped cache keys.
//!
//! A `CacheKey` pairs a resource id (a cluster) with the bucket it was
//! computed in. Keys live inside one environment's map, so the environment
//! is implied by where the key is stored.

use chrono::{DateTime, Utc};

/// Immutable `(resource_id, bucket)` lookup key.
///
/// Ordering is by bucket first, so the minimum key of a map is the entry
/// from the oldest bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Private inner data - keys are only built through `new()`
    inner: CacheKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct CacheKeyInner {
    bucket: DateTime<Utc>,
    resource_id: String,
}

impl CacheKey {
    /// Create a key for one resource in one bucket.
    pub fn new(resource_id: impl Into<String>, bucket: DateTime<Utc>) -> Self {
        Self {
            inner: CacheKeyInner {
                bucket,
                resource_id: resource_id.into(),
            },
        }
    }

    /// The resource this key refers to.
    pub fn resource_id(&self) -> &str {
        &self.inner.resource_id
    }

    /// The bucket timestamp of this key.
    pub fn bucket(&self) -> DateTime<Utc> {
        self.inner.bucket
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.inner.resource_id, self.inner.bucket.timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashSet;

    #[test]
    fn test_key_accessors() {
        let bucket = Utc::now();
        let key = CacheKey::new("eks-dev-1", bucket);
        assert_eq!(key.resource_id(), "eks-dev-1");
        assert_eq!(key.bucket(), bucket);
    }

    #[test]
    fn test_same_resource_different_bucket_are_distinct() {
        let bucket = Utc::now();
        let a = CacheKey::new("c1", bucket);
        let b = CacheKey::new("c1", bucket + Duration::seconds(60));

        let set: HashSet<_> = [a.clone(), b.clone(), a.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_ordering_is_bucket_first() {
        let bucket = Utc::now();
        let older = CacheKey::new("zzz", bucket);
        let newer = CacheKey::new("aaa", bucket + Duration::seconds(1));
        assert!(older < newer);

        let keys = vec![newer.clone(), older.clone()];
        assert_eq!(keys.iter().min(), Some(&older));
    }

    #[test]
    fn test_display() {
        let bucket = DateTime::UNIX_EPOCH + Duration::milliseconds(1500);
        assert_eq!(CacheKey::new("c1", bucket).to_string(), "c1@1500");
    }
}
