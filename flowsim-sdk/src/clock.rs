//! Wall-clock hour lookup.

use chrono::Timelike;

/// Supplies the current hour of the day (0-23).
pub trait Clock: Send + Sync {
    /// Current hour of the day.
    fn current_hour(&self) -> u32;
}

/// The host's local time zone, read fresh on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn current_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// A clock frozen at one hour. Hours past 23 wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn current_hour(&self) -> u32 {
        self.0 % 24
    }
}
