//! Prometheus text exposition format.
//!
//! Renders the latest status snapshot as gauges for scraping by a
//! Prometheus server or compatible agent.

use crate::severity::SeverityLevel;
use crate::snapshot::StatusSnapshot;

const LEVELS: [SeverityLevel; 7] = [
    SeverityLevel::Starting,
    SeverityLevel::Good,
    SeverityLevel::Minor,
    SeverityLevel::Major,
    SeverityLevel::Maintenance,
    SeverityLevel::Shutdown,
    SeverityLevel::Overload,
];

/// Render a snapshot into Prometheus text format.
///
/// Before the first tick there is no snapshot; only HELP/TYPE lines are
/// emitted then.
pub fn render_prometheus(snapshot: Option<&StatusSnapshot>) -> String {
    let mut out = String::new();

    out.push_str("# HELP beacon_status Current service status, 1 for the active level.\n");
    out.push_str("# TYPE beacon_status gauge\n");
    if let Some(s) = snapshot {
        for level in LEVELS {
            out.push_str(&format!(
                "beacon_status{{service=\"{}\",level=\"{}\"}} {}\n",
                escape(s.name()),
                level,
                u8::from(s.level() == level)
            ));
        }
    }

    gauge(&mut out, snapshot, "beacon_uptime_seconds", "Service uptime in seconds.", |s| {
        s.uptime_secs().to_string()
    });
    gauge(&mut out, snapshot, "beacon_allocated_memory_bytes", "Memory held by the service in bytes.", |s| {
        s.allocated_memory().to_string()
    });
    gauge(&mut out, snapshot, "beacon_presumable_free_memory_bytes", "Memory the service can still claim in bytes.", |s| {
        s.presumable_free_memory().to_string()
    });
    gauge(&mut out, snapshot, "beacon_disk_total_bytes", "Total space of the storage filesystem in bytes.", |s| {
        s.total_space().to_string()
    });
    gauge(&mut out, snapshot, "beacon_disk_free_bytes", "Free space of the storage filesystem in bytes.", |s| {
        s.free_space().to_string()
    });
    gauge(&mut out, snapshot, "beacon_cpu_load", "Process CPU load (0.0-1.0).", |s| {
        s.cpu_load().to_string()
    });
    gauge(&mut out, snapshot, "beacon_warnings", "Number of active status warnings.", |s| {
        s.messages().len().to_string()
    });

    out
}

fn gauge(
    out: &mut String,
    snapshot: Option<&StatusSnapshot>,
    name: &str,
    help: &str,
    value: impl Fn(&StatusSnapshot) -> String,
) {
    out.push_str(&format!("# HELP {name} {help}\n"));
    out.push_str(&format!("# TYPE {name} gauge\n"));
    if let Some(s) = snapshot {
        out.push_str(&format!(
            "{name}{{service=\"{}\"}} {}\n",
            escape(s.name()),
            value(s)
        ));
    }
}

fn escape(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use beacon_metrics::{FixedSampler, RawMetrics};

    use super::*;
    use crate::aggregator::HealthAggregator;
    use crate::clock::ManualClock;
    use crate::settings::AggregatorSettings;
    use crate::snapshot::ServiceIdentity;

    fn test_snapshot() -> Arc<StatusSnapshot> {
        let settings = AggregatorSettings {
            identity: ServiceIdentity {
                name: "Validator \"X\"".to_string(),
                version: "2.0.0".to_string(),
            },
            ..AggregatorSettings::default()
        };
        let clock = ManualClock::new(1_000_000);
        let agg = HealthAggregator::with_clock(settings, Arc::new(clock.clone()));
        clock.advance(std::time::Duration::from_secs(60));
        agg.tick(&mut FixedSampler::new(RawMetrics {
            allocated_memory: 256_000_000,
            max_memory: 8_000_000_000,
            presumable_free_memory: 7_744_000_000,
            disk_free: 10_000_000_000,
            disk_total: 100_000_000_000,
            cpu_load: 0.5,
        }))
    }

    #[test]
    fn render_empty() {
        let output = render_prometheus(None);
        // Should still have type declarations.
        assert!(output.contains("# HELP beacon_status"));
        assert!(output.contains("# TYPE beacon_uptime_seconds gauge"));
        assert!(!output.lines().any(|l| !l.starts_with('#')));
    }

    #[test]
    fn render_snapshot() {
        let snapshot = test_snapshot();
        let output = render_prometheus(Some(&*snapshot));

        assert!(output.contains("beacon_status{service=\"Validator \\\"X\\\"\",level=\"MINOR\"} 1"));
        assert!(output.contains("beacon_status{service=\"Validator \\\"X\\\"\",level=\"GOOD\"} 0"));
        assert!(output.contains("beacon_uptime_seconds{service=\"Validator \\\"X\\\"\"} 60"));
        assert!(output.contains("beacon_allocated_memory_bytes{service=\"Validator \\\"X\\\"\"} 256000000"));
        assert!(output.contains("beacon_disk_free_bytes{service=\"Validator \\\"X\\\"\"} 10000000000"));
        assert!(output.contains("beacon_cpu_load{service=\"Validator \\\"X\\\"\"} 0.500000"));
        assert!(output.contains("beacon_warnings{service=\"Validator \\\"X\\\"\"} 1"));
    }

    #[test]
    fn render_format_is_prometheus_compatible() {
        let snapshot = test_snapshot();
        let output = render_prometheus(Some(&*snapshot));

        for line in output.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            assert!(
                line.contains('{') && line.contains('}'),
                "line should have labels: {line}"
            );
        }
    }
}
