//! Published status values.
//!
//! Both types are immutable once built: fields are private and only read
//! through accessors. The aggregator builds a fresh pair every tick.

use beacon_metrics::RawMetrics;
use serde::{Serialize, Serializer};

use crate::severity::SeverityLevel;

/// How long the bootstrap directive stays valid, in milliseconds.
pub const BOOTSTRAP_VALIDITY_MS: u64 = 2_000;

/// Name and version reported alongside every status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceIdentity {
    pub name: String,
    pub version: String,
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self {
            name: "Beacon".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Point-in-time health record served by the diagnostic endpoint.
///
/// Serializes with a fixed field order, numbers as decimal strings, and
/// without `messages` when there are none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    name: String,
    status: SeverityLevel,
    #[serde(serialize_with = "decimal")]
    heartbeat: u64,
    #[serde(serialize_with = "decimal")]
    will_expire_at: u64,
    version: String,
    #[serde(serialize_with = "decimal")]
    uptime: u64,
    #[serde(serialize_with = "decimal")]
    allocated_memory: u64,
    #[serde(serialize_with = "decimal")]
    presumable_free_memory: u64,
    #[serde(serialize_with = "decimal")]
    total_space: u64,
    #[serde(serialize_with = "decimal")]
    free_space: u64,
    cpu_load: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    messages: Option<Vec<String>>,
}

fn decimal<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Everything a tick knows when it builds a snapshot.
#[derive(Debug, Clone)]
pub(crate) struct SnapshotInput<'a> {
    pub identity: &'a ServiceIdentity,
    pub level: SeverityLevel,
    pub heartbeat: u64,
    pub will_expire_at: u64,
    pub started_at: u64,
    pub metrics: &'a RawMetrics,
    pub warnings: Vec<String>,
}

impl StatusSnapshot {
    pub(crate) fn new(input: SnapshotInput<'_>) -> Self {
        let messages = (!input.warnings.is_empty()).then_some(input.warnings);
        Self {
            name: input.identity.name.clone(),
            status: input.level,
            heartbeat: input.heartbeat,
            will_expire_at: input.will_expire_at,
            version: input.identity.version.clone(),
            uptime: input.heartbeat.saturating_sub(input.started_at) / 1_000,
            allocated_memory: input.metrics.allocated_memory,
            presumable_free_memory: input.metrics.presumable_free_memory,
            total_space: input.metrics.disk_total,
            free_space: input.metrics.disk_free,
            cpu_load: format!("{:.6}", input.metrics.cpu_load),
            messages,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> SeverityLevel {
        self.status
    }

    /// When the status was taken, epoch milliseconds.
    pub fn heartbeat(&self) -> u64 {
        self.heartbeat
    }

    /// When the status goes stale, epoch milliseconds.
    pub fn will_expire_at(&self) -> u64 {
        self.will_expire_at
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn uptime_secs(&self) -> u64 {
        self.uptime
    }

    pub fn allocated_memory(&self) -> u64 {
        self.allocated_memory
    }

    pub fn presumable_free_memory(&self) -> u64 {
        self.presumable_free_memory
    }

    pub fn total_space(&self) -> u64 {
        self.total_space
    }

    pub fn free_space(&self) -> u64 {
        self.free_space
    }

    /// CPU load formatted with six decimals.
    pub fn cpu_load(&self) -> &str {
        &self.cpu_load
    }

    /// Warnings in rule order; empty when the status is clean.
    pub fn messages(&self) -> &[String] {
        self.messages.as_deref().unwrap_or_default()
    }
}

/// The header-sized subset of a snapshot served to cheap probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheDirective {
    status: SeverityLevel,
    name: String,
    version: String,
    last_modified: u64,
    expires: u64,
}

impl CacheDirective {
    pub(crate) fn new(
        identity: &ServiceIdentity,
        level: SeverityLevel,
        last_modified: u64,
        expires: u64,
    ) -> Self {
        Self {
            status: level,
            name: identity.name.clone(),
            version: identity.version.clone(),
            last_modified,
            expires,
        }
    }

    /// Directive served before the first tick completes.
    pub(crate) fn bootstrap(identity: &ServiceIdentity, now: u64) -> Self {
        Self::new(
            identity,
            SeverityLevel::Starting,
            now,
            now.saturating_add(BOOTSTRAP_VALIDITY_MS),
        )
    }

    pub fn level(&self) -> SeverityLevel {
        self.status
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Epoch milliseconds.
    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    /// Epoch milliseconds.
    pub fn expires(&self) -> u64 {
        self.expires
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ServiceIdentity {
        ServiceIdentity {
            name: "Validator X".to_string(),
            version: "2.0.0".to_string(),
        }
    }

    fn metrics() -> RawMetrics {
        RawMetrics {
            allocated_memory: 2_147_483_648,
            max_memory: 8_589_934_592,
            presumable_free_memory: 1_073_741_824,
            disk_free: 786_432_000,
            disk_total: 1_099_511_627_776,
            cpu_load: 0.1234567,
        }
    }

    fn snapshot(warnings: Vec<String>) -> StatusSnapshot {
        let identity = identity();
        let metrics = metrics();
        StatusSnapshot::new(SnapshotInput {
            identity: &identity,
            level: SeverityLevel::Minor,
            heartbeat: 1_488_469_744_783,
            will_expire_at: 1_488_469_824_783,
            started_at: 1_488_469_684_000,
            metrics: &metrics,
            warnings,
        })
    }

    #[test]
    fn computes_uptime_and_formats_cpu() {
        let s = snapshot(Vec::new());
        assert_eq!(s.uptime_secs(), 60);
        assert_eq!(s.cpu_load(), "0.123457");
        assert_eq!(s.level(), SeverityLevel::Minor);
        assert_eq!(s.free_space(), 786_432_000);
        assert!(s.messages().is_empty());
    }

    #[test]
    fn serializes_numbers_as_strings_in_fixed_order() {
        let json = serde_json::to_string(&snapshot(vec!["Less than 10% RAM available".into()]))
            .unwrap();

        let order = [
            "\"name\"",
            "\"status\"",
            "\"heartbeat\"",
            "\"willExpireAt\"",
            "\"version\"",
            "\"uptime\"",
            "\"allocatedMemory\"",
            "\"presumableFreeMemory\"",
            "\"totalSpace\"",
            "\"freeSpace\"",
            "\"cpuLoad\"",
            "\"messages\"",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|key| json.find(key).unwrap_or_else(|| panic!("{key} missing in {json}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");

        assert!(json.contains("\"status\":\"MINOR\""));
        assert!(json.contains("\"heartbeat\":\"1488469744783\""));
        assert!(json.contains("\"totalSpace\":\"1099511627776\""));
        assert!(json.contains("\"messages\":[\"Less than 10% RAM available\"]"));
    }

    #[test]
    fn empty_messages_are_omitted() {
        let json = serde_json::to_string(&snapshot(Vec::new())).unwrap();
        assert!(!json.contains("messages"), "{json}");
    }

    #[test]
    fn bootstrap_directive_is_short_lived() {
        let d = CacheDirective::bootstrap(&identity(), 5_000);
        assert_eq!(d.level(), SeverityLevel::Starting);
        assert_eq!(d.last_modified(), 5_000);
        assert_eq!(d.expires(), 5_000 + BOOTSTRAP_VALIDITY_MS);
        assert_eq!(d.name(), "Validator X");
    }
}
