//! Snapshot - the readings produced by one publish cycle.

use crate::Mode;

/// A single household's flow reading within a snapshot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// Household identifier.
    pub household: String,

    /// Mode the household was simulated in.
    pub mode: Mode,

    /// Flow rate in liters per minute. Never negative.
    pub flow_lpm: f64,
}

impl Reading {
    /// Create a reading.
    pub fn new(household: impl Into<String>, mode: Mode, flow_lpm: f64) -> Self {
        Self {
            household: household.into(),
            mode,
            flow_lpm,
        }
    }

    /// Returns true if this reading reports any flow at all.
    pub fn is_flowing(&self) -> bool {
        self.flow_lpm > 0.0
    }
}

/// The readings of every configured household for one publish cycle.
///
/// A snapshot is built fresh each cycle, pushed to the collector, and then
/// dropped; nothing carries over into the next cycle. Readings are kept in
/// the order they were recorded, and each (household, mode) pair appears at
/// most once.
///
/// # Example
///
/// ```rust
/// use flowsim_types::{Mode, Snapshot};
///
/// let snapshot = Snapshot::builder()
///     .reading("A101", Mode::Normal, 0.0)
///     .reading("B202", Mode::SlowLeak, 0.12)
///     .reading("C303", Mode::MajorLeak, 5.4)
///     .build();
///
/// assert_eq!(snapshot.len(), 3);
/// assert_eq!(snapshot.get("B202").unwrap().flow_lpm, 0.12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Unix timestamp in milliseconds when this snapshot was taken.
    pub timestamp_ms: u64,

    /// Readings in recording order.
    pub readings: Vec<Reading>,
}

impl Snapshot {
    /// Create an empty snapshot stamped with the current time.
    pub fn new() -> Self {
        Self::with_timestamp(current_timestamp_ms())
    }

    /// Create an empty snapshot with a specific timestamp.
    pub fn with_timestamp(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            readings: Vec::new(),
        }
    }

    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Record a reading, replacing any earlier reading for the same
    /// (household, mode) pair.
    pub fn record(&mut self, household: impl Into<String>, mode: Mode, flow_lpm: f64) {
        let household = household.into();
        match self
            .readings
            .iter_mut()
            .find(|r| r.household == household && r.mode == mode)
        {
            Some(existing) => existing.flow_lpm = flow_lpm,
            None => self.readings.push(Reading {
                household,
                mode,
                flow_lpm,
            }),
        }
    }

    /// Check if the snapshot has no readings.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Number of readings in the snapshot.
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Get the reading for a household.
    pub fn get(&self, household: &str) -> Option<&Reading> {
        self.readings.iter().find(|r| r.household == household)
    }

    /// Iterate over readings in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    /// Sum of all flow rates in the snapshot.
    pub fn total_flow_lpm(&self) -> f64 {
        self.readings.iter().map(|r| r.flow_lpm).sum()
    }

    /// The (household, mode) label pairs, in recording order.
    pub fn label_sets(&self) -> Vec<(&str, Mode)> {
        self.readings
            .iter()
            .map(|r| (r.household.as_str(), r.mode))
            .collect()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing `Snapshot` instances.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    timestamp_ms: Option<u64>,
    readings: Vec<Reading>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Add a reading.
    pub fn reading(mut self, household: impl Into<String>, mode: Mode, flow_lpm: f64) -> Self {
        self.readings.push(Reading::new(household, mode, flow_lpm));
        self
    }

    /// Build the snapshot. Later readings for a repeated (household, mode)
    /// pair replace earlier ones.
    pub fn build(self) -> Snapshot {
        let mut snapshot =
            Snapshot::with_timestamp(self.timestamp_ms.unwrap_or_else(current_timestamp_ms));
        for reading in self.readings {
            snapshot.record(reading.household, reading.mode, reading.flow_lpm);
        }
        snapshot
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
