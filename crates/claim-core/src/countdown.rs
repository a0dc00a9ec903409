//! Claim window countdown

use chrono::{DateTime, Utc};
use std::fmt;

const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_MINUTE: u64 = 60;

/// Remaining time split into display units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownParts {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

/// Seconds remaining until the claim window closes, floored at zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining_secs: u64,
}

impl Countdown {
    pub fn from_secs(remaining_secs: u64) -> Self {
        Self { remaining_secs }
    }

    /// Countdown from `now` to `deadline`; zero if the deadline has passed
    pub fn until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining = (deadline - now).num_seconds().max(0);
        Self::from_secs(remaining as u64)
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_secs == 0
    }

    /// Advance by one second
    pub fn tick(&mut self) {
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
    }

    pub fn parts(&self) -> CountdownParts {
        let s = self.remaining_secs;
        CountdownParts {
            days: s / SECS_PER_DAY,
            hours: (s % SECS_PER_DAY) / SECS_PER_HOUR,
            minutes: (s % SECS_PER_HOUR) / SECS_PER_MINUTE,
            seconds: s % SECS_PER_MINUTE,
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.parts();
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            p.days, p.hours, p.minutes, p.seconds
        )
    }
}
