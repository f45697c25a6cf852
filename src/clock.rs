//! Monotonic timestamp capture.
//!
//! Timestamps are taken from `std::time::Instant` (the best monotonic source
//! the platform offers, never wall-clock-adjustable) and anchored to a
//! process-wide epoch so they carry renderable seconds/nanoseconds components
//! for the output formatters.

use std::sync::OnceLock;
use std::time::Instant;

use serde::Serialize;

fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// A monotonic instant, expressed as elapsed time since the process epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Timestamp {
    pub secs: u64,
    pub nanos: u32,
}

impl Timestamp {
    /// Capture the current monotonic time.
    pub fn now() -> Self {
        let elapsed = epoch().elapsed();
        Timestamp {
            secs: elapsed.as_secs(),
            nanos: elapsed.subsec_nanos(),
        }
    }

    fn as_nanos(self) -> i128 {
        self.secs as i128 * 1_000_000_000 + self.nanos as i128
    }
}

/// `end - start` in nanoseconds. Callers pass `start, end` in chronological
/// order; a misordered pair yields a negative value, which is passed through.
pub fn diff_ns(start: Timestamp, end: Timestamp) -> i128 {
    end.as_nanos() - start.as_nanos()
}

/// `end - start` in milliseconds, with the same sign convention as [`diff_ns`].
pub fn diff_ms(start: Timestamp, end: Timestamp) -> f64 {
    diff_ns(start, end) as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timestamps_are_monotonic() {
        let a = Timestamp::now();
        std::thread::sleep(Duration::from_millis(2));
        let b = Timestamp::now();
        assert!(b > a);
        assert!(diff_ns(a, b) > 0);
        assert!(diff_ms(a, b) > 0.0);
    }

    #[test]
    fn misordered_diff_is_negative_not_a_panic() {
        let a = Timestamp::now();
        std::thread::sleep(Duration::from_millis(1));
        let b = Timestamp::now();
        assert!(diff_ns(b, a) < 0);
        assert!(diff_ms(b, a) < 0.0);
    }

    #[test]
    fn diff_units_agree() {
        let a = Timestamp { secs: 1, nanos: 500_000_000 };
        let b = Timestamp { secs: 2, nanos: 0 };
        assert_eq!(diff_ns(a, b), 500_000_000);
        assert!((diff_ms(a, b) - 500.0).abs() < f64::EPSILON);
    }
}
