//! Deterministic `Clock` for tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use emberwake_core::clock::Clock;
use std::sync::Mutex;

/// A clock that returns a pinned instant, optionally advancing by a fixed
/// step on every read so orderings by time stay strict.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl FixedClock {
    /// A clock that always returns `at`.
    #[must_use]
    pub fn at(at: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(at),
            step: Duration::zero(),
        }
    }

    /// A clock starting at `at` that moves forward one second per read.
    #[must_use]
    pub fn ticking(at: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(at),
            step: Duration::seconds(1),
        }
    }

    /// 2026-01-15 10:00:00 UTC, the instant most tests pin to.
    ///
    /// # Panics
    ///
    /// Never; the date literal is valid.
    #[must_use]
    pub fn default_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Self::default_instant())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = self.now.lock().unwrap();
        let current = *now;
        *now = current + self.step;
        current
    }
}
