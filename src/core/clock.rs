//! Monotonic Match Clock
//!
//! All match timing is expressed as nanoseconds on a monotonic clock.
//! Zero is reserved as the "timer disarmed" sentinel, so the clock never
//! reports zero: readings start at one nanosecond past the clock's epoch.

use std::time::{Duration, Instant};

/// Nanoseconds in one second.
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Monotonic clock reporting nanoseconds since it was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Start a new clock.
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }

    /// Current reading in nanoseconds. Always non-zero.
    pub fn now_ns(&self) -> u64 {
        let elapsed = self.epoch.elapsed().as_nanos();
        (elapsed.min(u64::MAX as u128 - 1) as u64) + 1
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a duration to whole nanoseconds, saturating.
pub fn duration_to_ns(duration: Duration) -> u64 {
    duration.as_nanos().min(u64::MAX as u128) as u64
}

/// Whole seconds remaining, rounded up.
///
/// `ceil_secs(1)` is 1; `ceil_secs(0)` is 0.
#[inline]
pub fn ceil_secs(ns: u64) -> u64 {
    ns.div_ceil(NANOS_PER_SEC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_never_zero() {
        let clock = MonotonicClock::new();
        assert!(clock.now_ns() > 0);
    }

    #[test]
    fn test_clock_monotonic() {
        let clock = MonotonicClock::new();
        let a = clock.now_ns();
        std::thread::sleep(Duration::from_millis(1));
        let b = clock.now_ns();
        assert!(b > a);
    }

    #[test]
    fn test_ceil_secs() {
        assert_eq!(ceil_secs(0), 0);
        assert_eq!(ceil_secs(1), 1);
        assert_eq!(ceil_secs(NANOS_PER_SEC), 1);
        assert_eq!(ceil_secs(NANOS_PER_SEC + 1), 2);
        assert_eq!(ceil_secs(9_950_000_000), 10);
    }

    #[test]
    fn test_duration_to_ns() {
        assert_eq!(duration_to_ns(Duration::from_millis(50)), 50_000_000);
    }
}
