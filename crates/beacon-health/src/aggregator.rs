//! Health aggregator — background task that grades host metrics and
//! publishes status snapshots.
//!
//! One task calls [`HealthAggregator::tick`] on a fixed delay. Each tick
//! builds a fresh `StatusSnapshot` and `CacheDirective` and swaps both into
//! a single watch slot, so readers always get a matching pair and never
//! see a half-built value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use beacon_metrics::{MetricSampler, RawMetrics};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{HealthError, HealthResult};
use crate::rules::{evaluate, Assessment};
use crate::settings::AggregatorSettings;
use crate::severity::SeverityLevel;
use crate::snapshot::{CacheDirective, SnapshotInput, StatusSnapshot};

/// Warning published when no reading has ever succeeded.
pub const METRICS_UNAVAILABLE: &str = "Health metrics unavailable";

/// The pair replaced on every tick.
#[derive(Debug, Clone)]
pub struct Published {
    pub directive: Arc<CacheDirective>,
    /// `None` until the first tick.
    pub snapshot: Option<Arc<StatusSnapshot>>,
}

/// Last graded reading, reused when sampling fails.
#[derive(Debug, Clone)]
struct Reading {
    metrics: RawMetrics,
    assessment: Assessment,
}

impl Reading {
    fn unavailable() -> Self {
        Self {
            metrics: RawMetrics::default(),
            assessment: Assessment {
                level: SeverityLevel::Starting,
                warnings: vec![METRICS_UNAVAILABLE.to_string()],
            },
        }
    }
}

/// Grades host metrics on a timer and publishes the result.
pub struct HealthAggregator {
    settings: AggregatorSettings,
    clock: Arc<dyn Clock>,
    /// Epoch millis at construction; uptime is measured from here.
    started_at: u64,
    shutdown_requested: AtomicBool,
    overload_detected: AtomicBool,
    /// Held for the whole tick, so ticks never overlap.
    last_reading: Mutex<Option<Reading>>,
    published: watch::Sender<Published>,
}

impl HealthAggregator {
    /// Create an aggregator using the system clock.
    pub fn new(settings: AggregatorSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: AggregatorSettings, clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now_millis();
        let (published, _) = watch::channel(Published {
            directive: Arc::new(CacheDirective::bootstrap(&settings.identity, started_at)),
            snapshot: None,
        });

        Self {
            settings,
            clock,
            started_at,
            shutdown_requested: AtomicBool::new(false),
            overload_detected: AtomicBool::new(false),
            last_reading: Mutex::new(None),
            published,
        }
    }

    /// Run one aggregation cycle and publish its result.
    ///
    /// Never fails: when the sampler cannot read anything at all, the
    /// previous reading is reused with fresh timestamps.
    pub fn tick<S: MetricSampler + ?Sized>(&self, sampler: &mut S) -> Arc<StatusSnapshot> {
        let mut last = self
            .last_reading
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let reading = match sampler.sample() {
            Ok(metrics) => Reading {
                assessment: evaluate(&metrics, &self.settings.thresholds),
                metrics,
            },
            Err(e) => match last.as_ref() {
                Some(previous) => {
                    warn!(error = %e, "metric sampling failed, reusing previous reading");
                    previous.clone()
                }
                None => {
                    warn!(error = %e, "metric sampling failed before any reading");
                    Reading::unavailable()
                }
            },
        };

        let heartbeat = self.clock.now_millis();
        let period_ms = self.settings.period.as_millis() as u64;
        let will_expire_at = heartbeat.saturating_add(
            period_ms.saturating_mul(reading.assessment.level.expiry_multiplier() as u64),
        );
        let level = self.resolve_level(reading.assessment.level);

        let snapshot = Arc::new(StatusSnapshot::new(SnapshotInput {
            identity: &self.settings.identity,
            level,
            heartbeat,
            will_expire_at,
            started_at: self.started_at,
            metrics: &reading.metrics,
            warnings: reading.assessment.warnings.clone(),
        }));
        let directive = Arc::new(CacheDirective::new(
            &self.settings.identity,
            level,
            heartbeat,
            will_expire_at,
        ));

        let previous = self.published.send_replace(Published {
            directive,
            snapshot: Some(Arc::clone(&snapshot)),
        });
        if previous.directive.level() != level {
            info!(from = %previous.directive.level(), to = %level, "service status changed");
        }
        debug!(
            %level,
            warnings = snapshot.messages().len(),
            will_expire_at,
            "status snapshot published"
        );

        *last = Some(reading);
        snapshot
    }

    fn resolve_level(&self, graded: SeverityLevel) -> SeverityLevel {
        if self.shutdown_requested.load(Ordering::Acquire) {
            SeverityLevel::Shutdown
        } else if self.overload_detected.load(Ordering::Acquire) {
            SeverityLevel::Overload
        } else {
            graded
        }
    }

    /// Tick immediately, then once per period until shutdown is signalled.
    ///
    /// A final tick runs on shutdown so the last published status reflects
    /// any override set during teardown.
    pub async fn run<S: MetricSampler>(&self, mut sampler: S, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.settings.period.as_millis() as u64,
            service = %self.settings.identity.name,
            "status aggregator started"
        );

        self.tick(&mut sampler);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.settings.period) => {
                    self.tick(&mut sampler);
                }
                _ = shutdown.changed() => {
                    info!("status aggregator shutting down");
                    self.tick(&mut sampler);
                    break;
                }
            }
        }
    }

    // ── Queries ────────────────────────────────────────────────

    /// Latest cache directive; the STARTING bootstrap before the first tick.
    pub fn current_cache_directive(&self) -> Arc<CacheDirective> {
        Arc::clone(&self.published.borrow().directive)
    }

    /// Latest snapshot, `None` before the first tick.
    pub fn current_snapshot(&self) -> Option<Arc<StatusSnapshot>> {
        self.published.borrow().snapshot.clone()
    }

    /// Receiver notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.published.subscribe()
    }

    /// Fail with `ServiceDegraded` while the latest status is MAJOR.
    pub fn assert_not_major(&self) -> HealthResult<()> {
        let snapshot = self.current_snapshot().ok_or(HealthError::NotStarted)?;
        if snapshot.level() == SeverityLevel::Major {
            if let Some(message) = snapshot.messages().last() {
                error!(%message, "refusing work while service status is MAJOR");
            }
            return Err(HealthError::degraded());
        }
        Ok(())
    }

    // ── Overrides ──────────────────────────────────────────────

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Report SHUTDOWN from the next tick on. Idempotent.
    pub fn request_shutdown(&self) {
        if !self.shutdown_requested.swap(true, Ordering::AcqRel) {
            info!("shutdown requested, status will report SHUTDOWN from the next tick");
        }
    }

    /// Report OVERLOAD from the next tick on. Idempotent.
    pub fn report_overload(&self) {
        if !self.overload_detected.swap(true, Ordering::AcqRel) {
            error!("fatal errors have been detected due to overloading of the system");
        }
    }

    pub fn is_overloaded(&self) -> bool {
        self.overload_detected.load(Ordering::Acquire)
    }
}
