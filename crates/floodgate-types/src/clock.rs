//! Clocks for window scores and halt deadlines.

use std::time::Instant;

use chrono::Utc;

/// A monotonic clock anchored at process start.
///
/// Window scores only need to be self-consistent within the process that
/// writes them; no wall-clock epoch is shared across hosts. Clones share the
/// same anchor, so a reporter and a regulator constructed from the same clock
/// agree on `now`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Seconds elapsed since the clock was created.
    pub fn now_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock seconds since the Unix epoch.
///
/// Temporary-halt deadlines are written by the regulator and read by worker
/// processes on other hosts, so unlike window scores they need a shared
/// epoch.
pub fn unix_time_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let clock = MonotonicClock::new();
        let a = clock.now_secs();
        let b = clock.now_secs();
        assert!(b >= a);
    }

    #[test]
    fn clones_share_the_anchor() {
        let clock = MonotonicClock::new();
        let other = clock;
        assert!((clock.now_secs() - other.now_secs()).abs() < 0.5);
    }

    #[test]
    fn unix_time_is_a_plausible_epoch_offset() {
        let now = unix_time_secs();
        // after 2020-01-01
        assert!(now > 1_577_836_800.0);
        assert!(unix_time_secs() >= now);
    }
}
