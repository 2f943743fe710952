//! Host metric sampling behind a small trait.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sysinfo::{Disks, Pid, System};
use tracing::{debug, warn};

use crate::error::{MetricsError, MetricsResult};

/// One reading of the host resources the aggregator grades.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawMetrics {
    /// Memory currently held by the process, in bytes.
    pub allocated_memory: u64,
    /// Memory ceiling the process may grow to, in bytes.
    pub max_memory: u64,
    /// Memory that can still be claimed before hitting the ceiling, in bytes.
    pub presumable_free_memory: u64,
    /// Free space of the monitored filesystem, in bytes.
    ///
    /// This is the space available to an unprivileged process, so blocks
    /// reserved for root are not counted. Zero when the filesystem cannot
    /// be resolved.
    pub disk_free: u64,
    /// Total size of the monitored filesystem, in bytes.
    pub disk_total: u64,
    /// Process CPU load over all cores, 0.0 to 1.0.
    pub cpu_load: f64,
}

impl RawMetrics {
    /// Free disk over total disk. `None` when the total is unknown.
    pub fn usable_disk_fraction(&self) -> Option<f64> {
        ratio(self.disk_free, self.disk_total)
    }

    /// Allocated memory over the memory ceiling. `None` when the ceiling is unknown.
    pub fn used_memory_fraction(&self) -> Option<f64> {
        ratio(self.allocated_memory, self.max_memory)
    }
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

/// Source of resource readings.
///
/// Called from the aggregator's tick task only, never concurrently.
pub trait MetricSampler: Send {
    fn sample(&mut self) -> MetricsResult<RawMetrics>;
}

/// Reads memory, disk, and CPU of the running process via `sysinfo`.
///
/// Memory and disk are read independently. When the storage directory or
/// its filesystem cannot be resolved the reading reports no disk space at
/// all, which grades as MAJOR. Only a failure to read the process itself
/// fails the whole sample.
pub struct SystemSampler {
    system: System,
    disks: Disks,
    pid: Pid,
    storage_dir: PathBuf,
    memory_limit: Option<u64>,
    cpu_count: f64,
}

impl SystemSampler {
    /// Create a sampler watching the filesystem that holds `storage_dir`.
    ///
    /// `memory_limit` caps the memory ceiling; the host's physical memory
    /// is used when unset.
    pub fn new(storage_dir: impl Into<PathBuf>, memory_limit: Option<u64>) -> MetricsResult<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| MetricsError::Process(e.to_string()))?;
        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1) as f64;

        let mut system = System::new();
        // Prime the CPU counters so the first tick reports a real delta.
        system.refresh_process(pid);

        Ok(Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            pid,
            storage_dir: storage_dir.into(),
            memory_limit,
            cpu_count,
        })
    }

    fn sample_memory(&mut self) -> MetricsResult<(u64, u64, u64, f64)> {
        self.system.refresh_memory();
        if !self.system.refresh_process(self.pid) {
            return Err(MetricsError::Process(format!("pid {} vanished", self.pid)));
        }
        let process = self
            .system
            .process(self.pid)
            .ok_or_else(|| MetricsError::Process(format!("pid {} not listed", self.pid)))?;

        let allocated = process.memory();
        let max = self
            .memory_limit
            .unwrap_or_else(|| self.system.total_memory());
        let presumable_free = max
            .saturating_sub(allocated)
            .min(self.system.available_memory());

        let cpu_load = (process.cpu_usage() as f64 / (100.0 * self.cpu_count)).clamp(0.0, 1.0);

        Ok((allocated, max, presumable_free, cpu_load))
    }

    fn sample_disk(&mut self) -> MetricsResult<(u64, u64)> {
        let dir = std::fs::canonicalize(&self.storage_dir).map_err(|source| {
            MetricsError::StorageDir {
                path: self.storage_dir.clone(),
                source,
            }
        })?;

        self.disks.refresh_list();
        let disk = self
            .disks
            .list()
            .iter()
            .filter(|d| dir.starts_with(d.mount_point()))
            .max_by_key(|d| mount_depth(d.mount_point()))
            .ok_or_else(|| MetricsError::NoFilesystem(dir.clone()))?;

        debug!(mount = ?disk.mount_point(), dir = ?dir, "storage filesystem resolved");
        Ok((disk.available_space(), disk.total_space()))
    }
}

fn mount_depth(mount_point: &Path) -> usize {
    mount_point.components().count()
}

impl MetricSampler for SystemSampler {
    fn sample(&mut self) -> MetricsResult<RawMetrics> {
        let (allocated_memory, max_memory, presumable_free_memory, cpu_load) =
            self.sample_memory()?;
        let (disk_free, disk_total) = match self.sample_disk() {
            Ok(disk) => disk,
            Err(e) => {
                warn!(error = %e, "storage filesystem unreadable, reporting no disk space");
                (0, 0)
            }
        };

        Ok(RawMetrics {
            allocated_memory,
            max_memory,
            presumable_free_memory,
            disk_free,
            disk_total,
            cpu_load,
        })
    }
}

/// Sampler returning whatever reading was last stored in it.
///
/// Clones share the stored reading, so a test can keep a handle and change
/// the values while the aggregator's loop owns another clone.
#[derive(Debug, Clone, Default)]
pub struct FixedSampler {
    current: Arc<Mutex<Option<RawMetrics>>>,
}

impl FixedSampler {
    pub fn new(metrics: RawMetrics) -> Self {
        Self {
            current: Arc::new(Mutex::new(Some(metrics))),
        }
    }

    /// A sampler whose every read fails.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set(&self, metrics: RawMetrics) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(metrics);
    }

    /// Make subsequent reads fail.
    pub fn fail(&self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl MetricSampler for FixedSampler {
    fn sample(&mut self) -> MetricsResult<RawMetrics> {
        let current = *self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.ok_or_else(|| MetricsError::Unavailable("no reading configured".to_string()))
    }
}
