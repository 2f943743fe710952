//! beacon.toml configuration parser.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::units::{parse_byte_size, parse_duration};

/// 5 GiB.
pub const DEFAULT_DISK_SPACE_ALARM: u64 = 5 * 1024 * 1024 * 1024;
/// 512 MiB.
pub const DEFAULT_MEMORY_FLOOR: u64 = 512 * 1024 * 1024;
pub const DEFAULT_TEST_OBJECT_MAX_SIZE: u64 = DEFAULT_DISK_SPACE_ALARM;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub health: HealthConfig,
    pub server: ServerConfig,
}

/// Branding reported in the `Name` and `Version` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "Beacon".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory whose filesystem is monitored for free space.
    pub dir: PathBuf,
    /// Largest object the service accepts, e.g. "50GB". Kept as a raw
    /// property string and parsed on read.
    pub test_object_max_size: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            test_object_max_size: None,
        }
    }
}

impl StorageConfig {
    /// Read the test object max size in bytes.
    ///
    /// An unset property yields the 5 GiB default; a malformed one is an error.
    pub fn test_object_max_size(&self) -> ConfigResult<u64> {
        match &self.test_object_max_size {
            Some(raw) => parse_byte_size(raw),
            None => Ok(DEFAULT_TEST_OBJECT_MAX_SIZE),
        }
    }
}

/// Thresholds and cadence of the status aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub interval: String,
    pub disk_space_alarm: u64,
    pub memory_floor: u64,
    /// Caps the memory considered available to the service. Defaults to the
    /// host's physical memory when unset.
    pub memory_limit: Option<u64>,
    pub low_disk_ratio: f64,
    pub high_memory_ratio: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: "20s".to_string(),
            disk_space_alarm: DEFAULT_DISK_SPACE_ALARM,
            memory_floor: DEFAULT_MEMORY_FLOOR,
            memory_limit: None,
            low_disk_ratio: 0.13,
            high_memory_ratio: 0.90,
        }
    }
}

impl HealthConfig {
    pub fn interval(&self) -> ConfigResult<Duration> {
        let interval = parse_duration(&self.interval)?;
        if interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "health.interval",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(interval)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl BeaconConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: BeaconConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the aggregator cannot work with.
    ///
    /// The test object max size is not checked here; the aggregator falls
    /// back to the default when it cannot be parsed.
    pub fn validate(&self) -> ConfigResult<()> {
        self.health.interval()?;

        for (field, ratio) in [
            ("health.low_disk_ratio", self.health.low_disk_ratio),
            ("health.high_memory_ratio", self.health.high_memory_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{ratio} is outside (0, 1]"),
                });
            }
        }

        if self.service.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "service.name",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
