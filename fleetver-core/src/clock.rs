//! Wall-clock access and provenance formatting.

use crate::Timestamp;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Debug;
use std::sync::Mutex;

/// Source of "now" for bucket arithmetic and provenance stamps.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Timestamp;
}

/// The process wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Start at a fixed, round instant.
    pub fn epoch() -> Self {
        Self::new(DateTime::UNIX_EPOCH + chrono::Duration::days(20_000))
    }

    pub fn advance(&self, by: std::time::Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, at: Timestamp) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Abbreviate a multi-word timezone name to its initials.
///
/// `"India Standard Time"` becomes `"IST"`; single-word names pass through.
pub fn short_zone(zone: &str) -> String {
    let words: Vec<&str> = zone.split_whitespace().collect();
    if words.len() <= 1 {
        return zone.trim().to_string();
    }
    words.iter().filter_map(|w| w.chars().next()).collect()
}

fn zoned<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    short_zone(&at.format("%Z").to_string())
}

/// `HH:MM AM TZ` in the given timezone.
pub fn format_time_in<Tz: TimeZone>(at: Timestamp, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let local = at.with_timezone(tz);
    format!("{} {}", local.format("%I:%M %p"), zoned(&local))
}

/// `dd-mm-YYYY` in the given timezone.
pub fn format_date_in<Tz: TimeZone>(at: Timestamp, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.with_timezone(tz).format("%d-%m-%Y").to_string()
}

/// `HH:MM AM TZ` in local time.
pub fn format_time(at: Timestamp) -> String {
    format_time_in(at, &Local)
}

/// `dd-mm-YYYY` in local time.
pub fn format_date(at: Timestamp) -> String {
    format_date_in(at, &Local)
}

/// `dd-mm-YYYY HH:MM AM TZ` in local time.
pub fn format_display_time(at: Timestamp) -> String {
    format!("{} {}", format_date(at), format_time(at))
}
