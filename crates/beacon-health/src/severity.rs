//! Severity levels reported by the aggregator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Discrete health grade.
///
/// `Starting < Good < Minor < Major` are graded from thresholds.
/// `Shutdown` and `Overload` are forced by override flags and sit outside
/// that ordering. `Maintenance` is accepted on the wire but never produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityLevel {
    Starting,
    Good,
    Minor,
    Major,
    Maintenance,
    Shutdown,
    Overload,
}

impl SeverityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SeverityLevel::Starting => "STARTING",
            SeverityLevel::Good => "GOOD",
            SeverityLevel::Minor => "MINOR",
            SeverityLevel::Major => "MAJOR",
            SeverityLevel::Maintenance => "MAINTENANCE",
            SeverityLevel::Shutdown => "SHUTDOWN",
            SeverityLevel::Overload => "OVERLOAD",
        }
    }

    /// Position in the graded ordering, `None` for forced levels.
    fn rank(self) -> Option<u8> {
        match self {
            SeverityLevel::Starting => Some(0),
            SeverityLevel::Good => Some(1),
            SeverityLevel::Minor => Some(2),
            SeverityLevel::Major => Some(3),
            SeverityLevel::Maintenance | SeverityLevel::Shutdown | SeverityLevel::Overload => None,
        }
    }

    /// The worse of `self` and `other`.
    ///
    /// Never lowers a level. A forced level is never replaced by a graded one.
    pub fn escalate(self, other: SeverityLevel) -> SeverityLevel {
        match (self.rank(), other.rank()) {
            (Some(current), Some(next)) if next > current => other,
            (Some(_), None) => other,
            _ => self,
        }
    }

    /// How many aggregation periods a status at this level stays valid.
    pub fn expiry_multiplier(self) -> u32 {
        match self {
            SeverityLevel::Good => 8,
            SeverityLevel::Minor => 4,
            _ => 2,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown severity level: {0:?}")]
pub struct ParseLevelError(String);

impl FromStr for SeverityLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STARTING" => Ok(SeverityLevel::Starting),
            "GOOD" => Ok(SeverityLevel::Good),
            "MINOR" => Ok(SeverityLevel::Minor),
            "MAJOR" => Ok(SeverityLevel::Major),
            "MAINTENANCE" => Ok(SeverityLevel::Maintenance),
            "SHUTDOWN" => Ok(SeverityLevel::Shutdown),
            "OVERLOAD" => Ok(SeverityLevel::Overload),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}
