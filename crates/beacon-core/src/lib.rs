//! beacon-core — configuration and shared helpers for Beacon.
//!
//! Holds the `beacon.toml` model, the duration and byte-size parsers used
//! by it, and the error type reported when a config value cannot be read.

pub mod config;
pub mod error;
pub mod units;

pub use config::{BeaconConfig, HealthConfig, ServerConfig, ServiceConfig, StorageConfig};
pub use error::{ConfigError, ConfigResult};
pub use units::{display_size, parse_byte_size, parse_duration};
