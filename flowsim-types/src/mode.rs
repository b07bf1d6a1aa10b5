//! Simulation modes and the households that carry them.

use std::fmt;
use std::str::FromStr;

/// Simulated fault mode of a household's water supply.
///
/// A household's mode is fixed at configuration time and never changes for
/// the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Mode {
    /// Ordinary usage that follows the time of day.
    Normal,
    /// A dripping tap or running toilet: small, constant flow.
    SlowLeak,
    /// A burst pipe or a hose left on: large, constant flow.
    MajorLeak,
}

impl Mode {
    /// All modes, in declaration order.
    pub const ALL: [Mode; 3] = [Mode::Normal, Mode::SlowLeak, Mode::MajorLeak];

    /// Canonical name used in metric labels and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::SlowLeak => "SLOW_LEAK",
            Mode::MajorLeak => "MAJOR_LEAK",
        }
    }

    /// Returns true for the two leak modes, which always report flow.
    pub fn is_leak(&self) -> bool {
        matches!(self, Mode::SlowLeak | Mode::MajorLeak)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a mode name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError {
    name: String,
}

impl ParseModeError {
    /// The name that failed to parse.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown mode '{}' (expected NORMAL, SLOW_LEAK or MAJOR_LEAK)",
            self.name
        )
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for Mode {
    type Err = ParseModeError;

    /// Parses a mode name case-insensitively, accepting `-` in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| ParseModeError {
                name: s.to_string(),
            })
    }
}

/// A simulated household: an identifier plus its fixed mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Household {
    /// Household identifier, e.g. "A101".
    pub id: String,
    /// Simulated mode for this household.
    pub mode: Mode,
}

impl Household {
    /// Create a household.
    pub fn new(id: impl Into<String>, mode: Mode) -> Self {
        Self {
            id: id.into(),
            mode,
        }
    }
}

impl fmt::Display for Household {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_names() {
        assert_eq!(Mode::Normal.as_str(), "NORMAL");
        assert_eq!(Mode::SlowLeak.as_str(), "SLOW_LEAK");
        assert_eq!(Mode::MajorLeak.to_string(), "MAJOR_LEAK");
    }

    #[test]
    fn test_mode_parse_is_lenient() {
        assert_eq!("NORMAL".parse::<Mode>().unwrap(), Mode::Normal);
        assert_eq!("slow_leak".parse::<Mode>().unwrap(), Mode::SlowLeak);
        assert_eq!("major-leak".parse::<Mode>().unwrap(), Mode::MajorLeak);
        assert_eq!(" Normal ".parse::<Mode>().unwrap(), Mode::Normal);
    }

    #[test]
    fn test_mode_parse_rejects_unknown() {
        let err = "DROUGHT".parse::<Mode>().unwrap_err();
        assert_eq!(err.name(), "DROUGHT");
        assert!(err.to_string().contains("unknown mode"));
    }

    #[test]
    fn test_is_leak() {
        assert!(!Mode::Normal.is_leak());
        assert!(Mode::SlowLeak.is_leak());
        assert!(Mode::MajorLeak.is_leak());
    }

    #[test]
    fn test_household_display() {
        let household = Household::new("B202", Mode::SlowLeak);
        assert_eq!(household.to_string(), "B202 (SLOW_LEAK)");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_mode_serde_uses_canonical_names() {
        let json = serde_json::to_string(&Mode::MajorLeak).unwrap();
        assert_eq!(json, "\"MAJOR_LEAK\"");
        let mode: Mode = serde_json::from_str("\"SLOW_LEAK\"").unwrap();
        assert_eq!(mode, Mode::SlowLeak);
    }
}
