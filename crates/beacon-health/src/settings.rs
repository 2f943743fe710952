//! Aggregator settings resolved from `beacon.toml`.

use std::time::Duration;

use beacon_core::config::DEFAULT_TEST_OBJECT_MAX_SIZE;
use beacon_core::{BeaconConfig, ConfigResult};
use tracing::warn;

use crate::rules::Thresholds;
use crate::snapshot::ServiceIdentity;

pub const DEFAULT_PERIOD: Duration = Duration::from_millis(20_000);

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSettings {
    pub identity: ServiceIdentity,
    /// Delay between the end of one tick and the start of the next.
    pub period: Duration,
    pub thresholds: Thresholds,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            identity: ServiceIdentity::default(),
            period: DEFAULT_PERIOD,
            thresholds: Thresholds::default(),
        }
    }
}

impl AggregatorSettings {
    /// Resolve settings from config.
    ///
    /// An unreadable test object max size never fails resolution; it is
    /// replaced by the 5 GiB fallback.
    pub fn from_config(config: &BeaconConfig) -> ConfigResult<Self> {
        let period = config.health.interval()?;

        let test_object_max_size = match config.storage.test_object_max_size() {
            Ok(size) => size,
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = DEFAULT_TEST_OBJECT_MAX_SIZE,
                    "cannot read test object max size, using fallback"
                );
                DEFAULT_TEST_OBJECT_MAX_SIZE
            }
        };

        Ok(Self {
            identity: ServiceIdentity {
                name: config.service.name.clone(),
                version: config.service.version.clone(),
            },
            period,
            thresholds: Thresholds {
                test_object_max_size,
                disk_space_alarm: config.health.disk_space_alarm,
                low_disk_ratio: config.health.low_disk_ratio,
                high_memory_ratio: config.health.high_memory_ratio,
                memory_floor: config.health.memory_floor,
            },
        })
    }
}
