//! Quantized bucket allocation.
//!
//! Each environment keeps an anchor instant. The first lookup pins the
//! anchor to "now". Later lookups that are at least one TTL past the anchor
//! advance it by the largest whole multiple of the TTL that still fits, so
//! bucket boundaries stay aligned to the original anchor instead of drifting
//! to whichever request happened to cross the boundary.

use chrono::{DateTime, Duration as TimeDelta, Utc};
use std::time::Duration;

/// Outcome of one allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// The bucket the lookup belongs to.
    pub bucket: DateTime<Utc>,
    /// True when the anchor was created or moved by this call.
    pub advanced: bool,
}

fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1)
}

/// Map `now` to its bucket, updating `anchor` in place.
///
/// The returned bucket never decreases across calls with the same anchor,
/// even if `now` moves backwards.
pub fn allocate(anchor: &mut Option<DateTime<Utc>>, ttl: Duration, now: DateTime<Utc>) -> Allocation {
    let Some(current) = *anchor else {
        *anchor = Some(now);
        return Allocation {
            bucket: now,
            advanced: true,
        };
    };

    let elapsed = (now - current).num_milliseconds();
    let ttl = ttl_millis(ttl);
    if elapsed < ttl {
        return Allocation {
            bucket: current,
            advanced: false,
        };
    }

    let intervals = elapsed / ttl;
    let next = current + TimeDelta::milliseconds(intervals * ttl);
    *anchor = Some(next);
    Allocation {
        bucket: next,
        advanced: true,
    }
}

/// True when `now` lies past the end of `bucket`'s window.
pub fn is_stale(bucket: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    (now - bucket).num_milliseconds() > ttl_millis(ttl)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::UNIX_EPOCH + TimeDelta::days(19_000)
    }

    #[test]
    fn test_first_call_pins_anchor() {
        let mut anchor = None;
        let a = allocate(&mut anchor, Duration::from_secs(60), t0());
        assert_eq!(a.bucket, t0());
        assert!(a.advanced);
        assert_eq!(anchor, Some(t0()));
    }

    #[test]
    fn test_same_window_same_bucket() {
        let mut anchor = None;
        let ttl = Duration::from_secs(60);
        allocate(&mut anchor, ttl, t0());

        let a = allocate(&mut anchor, ttl, t0() + TimeDelta::seconds(10));
        let b = allocate(&mut anchor, ttl, t0() + TimeDelta::seconds(59));
        assert_eq!(a.bucket, t0());
        assert_eq!(b.bucket, t0());
        assert!(!a.advanced && !b.advanced);
    }

    #[test]
    fn test_rollover_is_quantized_to_original_anchor() {
        let mut anchor = None;
        let ttl = Duration::from_secs(60);
        allocate(&mut anchor, ttl, t0());

        // 2.5 windows later: anchor moves by exactly two windows
        let a = allocate(&mut anchor, ttl, t0() + TimeDelta::seconds(150));
        assert_eq!(a.bucket, t0() + TimeDelta::seconds(120));
        assert!(a.advanced);

        // still inside the third window
        let b = allocate(&mut anchor, ttl, t0() + TimeDelta::seconds(179));
        assert_eq!(b.bucket, t0() + TimeDelta::seconds(120));
        assert!(!b.advanced);
    }

    #[test]
    fn test_boundary_exactly_one_ttl_rolls_over() {
        let mut anchor = None;
        let ttl = Duration::from_secs(60);
        allocate(&mut anchor, ttl, t0());
        let a = allocate(&mut anchor, ttl, t0() + TimeDelta::seconds(60));
        assert_eq!(a.bucket, t0() + TimeDelta::seconds(60));
    }

    #[test]
    fn test_clock_going_backwards_keeps_bucket() {
        let mut anchor = None;
        let ttl = Duration::from_secs(60);
        allocate(&mut anchor, ttl, t0());
        let a = allocate(&mut anchor, ttl, t0() - TimeDelta::seconds(30));
        assert_eq!(a.bucket, t0());
        assert!(!a.advanced);
    }

    #[test]
    fn test_is_stale() {
        let ttl = Duration::from_secs(60);
        assert!(!is_stale(t0(), ttl, t0() + TimeDelta::seconds(60)));
        assert!(is_stale(t0(), ttl, t0() + TimeDelta::seconds(61)));
    }
}
