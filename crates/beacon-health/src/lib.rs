//! beacon-health — service health aggregation for Beacon.
//!
//! Samples host metrics on a fixed period, grades them against
//! thresholds into a `SeverityLevel`, and publishes an immutable
//! `StatusSnapshot` plus a header-sized `CacheDirective` for concurrent
//! readers.
//!
//! # Architecture
//!
//! ```text
//! HealthAggregator
//!   ├── run() → tick loop (fixed delay, one tick at a time)
//!   │   ├── MetricSampler::sample() → RawMetrics
//!   │   ├── evaluate() → Assessment (level + warnings)
//!   │   ├── shutdown / overload overrides
//!   │   └── publish (CacheDirective, StatusSnapshot) into a watch slot
//!   └── queries: current_cache_directive(), current_snapshot(),
//!       assert_not_major(), is_shutting_down()
//! ```
//!
//! # Expiry
//!
//! Healthier states stay cacheable longer: GOOD for 8 periods, MINOR for
//! 4, anything else for 2. Overrides take effect on the next tick.

pub mod aggregator;
pub mod clock;
pub mod error;
pub mod prometheus;
pub mod rules;
pub mod settings;
pub mod severity;
pub mod snapshot;

pub use aggregator::{HealthAggregator, Published};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{HealthError, HealthResult};
pub use prometheus::render_prometheus;
pub use rules::{evaluate, Assessment, Thresholds};
pub use settings::AggregatorSettings;
pub use severity::SeverityLevel;
pub use snapshot::{CacheDirective, ServiceIdentity, StatusSnapshot};
