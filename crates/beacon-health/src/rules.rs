//! Threshold rules that grade a metrics reading.
//!
//! Rules run in a fixed order and can only escalate. Every rule that
//! matches contributes a warning, so a reading may carry several.

use beacon_core::config::{DEFAULT_DISK_SPACE_ALARM, DEFAULT_MEMORY_FLOOR, DEFAULT_TEST_OBJECT_MAX_SIZE};
use beacon_core::display_size;
use beacon_metrics::RawMetrics;

use crate::severity::SeverityLevel;

/// Limits a reading is graded against.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// Free disk below this is MAJOR: the service could not store one more object.
    pub test_object_max_size: u64,
    /// Free disk below this is MAJOR.
    pub disk_space_alarm: u64,
    /// Free-to-total disk ratio below this is MINOR.
    pub low_disk_ratio: f64,
    /// Allocated-to-ceiling memory ratio above this is MINOR.
    pub high_memory_ratio: f64,
    /// Presumably free memory below this is MAJOR.
    pub memory_floor: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            test_object_max_size: DEFAULT_TEST_OBJECT_MAX_SIZE,
            disk_space_alarm: DEFAULT_DISK_SPACE_ALARM,
            low_disk_ratio: 0.13,
            high_memory_ratio: 0.90,
            memory_floor: DEFAULT_MEMORY_FLOOR,
        }
    }
}

/// Level and warnings derived from one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub level: SeverityLevel,
    pub warnings: Vec<String>,
}

impl Assessment {
    fn raise(&mut self, level: SeverityLevel, warning: String) {
        self.level = self.level.escalate(level);
        self.warnings.push(warning);
    }
}

/// Grade a reading.
pub fn evaluate(metrics: &RawMetrics, thresholds: &Thresholds) -> Assessment {
    let mut assessment = Assessment {
        level: SeverityLevel::Good,
        warnings: Vec::new(),
    };

    if metrics.disk_free < thresholds.test_object_max_size {
        assessment.raise(
            SeverityLevel::Major,
            format!(
                "Less than {} disk space available",
                display_size(thresholds.test_object_max_size)
            ),
        );
    } else if metrics.disk_free < thresholds.disk_space_alarm {
        assessment.raise(
            SeverityLevel::Major,
            format!(
                "Less than {} disk space available",
                display_size(thresholds.disk_space_alarm)
            ),
        );
    }

    if metrics
        .usable_disk_fraction()
        .is_some_and(|free| free < thresholds.low_disk_ratio)
    {
        assessment.raise(
            SeverityLevel::Minor,
            format!(
                "Less than {}% disk space available",
                percent(thresholds.low_disk_ratio)
            ),
        );
    }

    if metrics
        .used_memory_fraction()
        .is_some_and(|used| used > thresholds.high_memory_ratio)
    {
        assessment.raise(
            SeverityLevel::Minor,
            format!(
                "Less than {}% RAM available",
                percent(1.0 - thresholds.high_memory_ratio)
            ),
        );
    }

    if metrics.presumable_free_memory < thresholds.memory_floor {
        assessment.raise(
            SeverityLevel::Major,
            format!("Less than {} RAM available", display_size(thresholds.memory_floor)),
        );
    }

    assessment
}

fn percent(ratio: f64) -> u64 {
    (ratio * 100.0).round() as u64
}
