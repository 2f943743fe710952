//! beacon-metrics — resource sampling for Beacon.
//!
//! Reads the instantaneous facts the status aggregator grades: process
//! memory against the memory ceiling, free and total space of the
//! filesystem holding the storage directory, and process CPU load.
//!
//! # Architecture
//!
//! ```text
//! MetricSampler (trait)
//!   ├── SystemSampler → sysinfo-backed host reads
//!   └── FixedSampler  → canned values for tests and dry runs
//! ```
//!
//! Sampling is driven from a single task; implementations may keep OS
//! handles between calls but expose no other state.

pub mod error;
pub mod sampler;

pub use error::{MetricsError, MetricsResult};
pub use sampler::{FixedSampler, MetricSampler, RawMetrics, SystemSampler};
