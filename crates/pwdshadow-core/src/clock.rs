//! Time source abstraction.
//!
//! The engine stamps `pwdShadowLastChange` with "today"; tests inject a
//! [`FixedClock`] so results are deterministic.

use std::fmt;

use crate::convert::SECONDS_PER_DAY;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Seconds since the UNIX epoch.
    fn now_secs(&self) -> i64;

    /// Days since the UNIX epoch.
    fn today(&self) -> i64 {
        self.now_secs() / SECONDS_PER_DAY
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl FixedClock {
    /// Clock frozen at midnight UTC of day `days`.
    pub fn from_days(days: i64) -> Self {
        Self(days * SECONDS_PER_DAY)
    }
}

impl Clock for FixedClock {
    fn now_secs(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_day_count() {
        assert_eq!(FixedClock::from_days(18000).today(), 18000);
        assert_eq!(FixedClock(86_399).today(), 0);
    }

    #[test]
    fn system_clock_is_after_2020() {
        // 2020-01-01 is day 18262
        assert!(SystemClock.today() > 18262);
    }
}
