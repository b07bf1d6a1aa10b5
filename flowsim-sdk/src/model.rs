//! The flow model: how much water a household uses at a given hour.
//!
//! Normal households follow a daily pattern. Peak hours (06-09 and 18-21)
//! see frequent bursts of 1-10 LPM, mid-day (10-17) occasional smaller bursts
//! of 0.5-5 LPM, and overnight (22-05) nothing at all. Leaking households
//! ignore the clock and report a constant draw every cycle: 0.05-0.2 LPM for a
//! slow leak, 3-8 LPM for a major one.
//!
//! Every reading is rounded to two decimal places.

use flowsim_types::{Household, Mode};

use crate::random::RandomSource;

/// Chance of a burst of flow during a peak hour.
pub const PEAK_FLOW_PROBABILITY: f64 = 0.4;

/// Chance of a burst of flow during a mid-day hour.
pub const MIDDAY_FLOW_PROBABILITY: f64 = 0.1;

/// Burst size during peak hours.
pub const PEAK_FLOW_LPM: FlowRange = FlowRange::new(1.0, 10.0);

/// Burst size during mid-day hours.
pub const MIDDAY_FLOW_LPM: FlowRange = FlowRange::new(0.5, 5.0);

/// Continuous flow of a slow leak.
pub const SLOW_LEAK_LPM: FlowRange = FlowRange::new(0.05, 0.2);

/// Continuous flow of a major leak.
pub const MAJOR_LEAK_LPM: FlowRange = FlowRange::new(3.0, 8.0);

/// Part of the day, as seen by a normal household.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPeriod {
    /// 06-09 and 18-21.
    Peak,
    /// 10-17.
    Midday,
    /// 22-05.
    Overnight,
}

impl DayPeriod {
    /// Classify an hour of the day. Hours past 23 wrap.
    pub fn from_hour(hour: u32) -> Self {
        match hour % 24 {
            6..=9 | 18..=21 => DayPeriod::Peak,
            10..=17 => DayPeriod::Midday,
            _ => DayPeriod::Overnight,
        }
    }
}

/// An inclusive range of flow rates in liters per minute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowRange {
    /// Lowest rate, inclusive.
    pub low: f64,
    /// Highest rate, inclusive.
    pub high: f64,
}

impl FlowRange {
    /// Create a range.
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Returns true if `lpm` lies within the range.
    pub fn contains(&self, lpm: f64) -> bool {
        self.low <= lpm && lpm <= self.high
    }

    /// Draw a rounded rate from the range.
    pub fn sample<R: RandomSource + ?Sized>(&self, rng: &mut R) -> f64 {
        round_lpm(rng.uniform(self.low, self.high)).clamp(self.low, self.high)
    }
}

/// Compute the flow for a household at the given hour.
///
/// Hours past 23 wrap. The result is never negative.
pub fn compute_flow<R: RandomSource + ?Sized>(
    household: &Household,
    hour: u32,
    rng: &mut R,
) -> f64 {
    flow_for_mode(household.mode, hour, rng)
}

/// Compute the flow for a mode at the given hour.
pub fn flow_for_mode<R: RandomSource + ?Sized>(mode: Mode, hour: u32, rng: &mut R) -> f64 {
    match mode {
        Mode::Normal => normal_flow(hour, rng),
        Mode::SlowLeak => SLOW_LEAK_LPM.sample(rng),
        Mode::MajorLeak => MAJOR_LEAK_LPM.sample(rng),
    }
}

fn normal_flow<R: RandomSource + ?Sized>(hour: u32, rng: &mut R) -> f64 {
    match DayPeriod::from_hour(hour) {
        DayPeriod::Peak => burst(rng, PEAK_FLOW_PROBABILITY, PEAK_FLOW_LPM),
        DayPeriod::Midday => burst(rng, MIDDAY_FLOW_PROBABILITY, MIDDAY_FLOW_LPM),
        DayPeriod::Overnight => 0.0,
    }
}

fn burst<R: RandomSource + ?Sized>(rng: &mut R, probability: f64, range: FlowRange) -> f64 {
    if rng.chance(probability) {
        range.sample(rng)
    } else {
        0.0
    }
}

/// Round a rate to two decimal places, half away from zero.
pub fn round_lpm(lpm: f64) -> f64 {
    (lpm * 100.0).round() / 100.0
}
