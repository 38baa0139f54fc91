//! Memory trend monitor.
//!
//! Samples memory indicators into a bounded ring of snapshots and fits a
//! least-squares line through them to tell sustained growth (a leak) from
//! ordinary fluctuation.
//!
//! Memory figures come from a [`MemoryProbe`]. [`ProcfsProbe`] reads
//! `/proc/self`; when the host exposes nothing, the estimate falls back to a
//! fixed overhead plus a per-item cost over every tracked collection. Only the
//! direction of the trend is meaningful, not the exact byte count.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{ConfigLoader, MonitorConfig};
use crate::error::Result;
use crate::models::diagnostics::{LeakSeverity, MemoryReport, MemorySnapshot, MemoryTrend, UNAVAILABLE};

/// Host memory introspection
#[cfg_attr(test, mockall::automock)]
pub trait MemoryProbe: Send + Sync {
    /// Resident memory of the process in MB, if the host exposes it
    fn resident_mb(&self) -> Option<f64>;

    /// Number of open handles, if the host exposes it
    fn handle_count(&self) -> Option<u64>;
}

/// Probe backed by `/proc/self` (Linux). Returns `None` elsewhere.
///
/// `statm` reports pages, not bytes. The default assumes 4 KiB pages; hosts
/// with larger pages (some aarch64 and ppc64 kernels) should use
/// [`ProcfsProbe::with_page_size`].
#[derive(Debug, Clone)]
pub struct ProcfsProbe {
    page_size_bytes: u64,
}

pub const DEFAULT_PAGE_SIZE_BYTES: u64 = 4096;

impl ProcfsProbe {
    pub fn with_page_size(page_size_bytes: u64) -> Self {
        Self { page_size_bytes }
    }

    pub fn page_size_bytes(&self) -> u64 {
        self.page_size_bytes
    }

    fn pages_to_mb(&self, pages: u64) -> f64 {
        (pages * self.page_size_bytes) as f64 / (1024.0 * 1024.0)
    }
}

impl Default for ProcfsProbe {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE_BYTES)
    }
}

impl MemoryProbe for ProcfsProbe {
    fn resident_mb(&self) -> Option<f64> {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        Some(self.pages_to_mb(resident_pages))
    }

    fn handle_count(&self) -> Option<u64> {
        std::fs::read_dir("/proc/self/fd")
            .ok()
            .map(|entries| entries.count() as u64)
    }
}

/// Probe for hosts without introspection; always falls back to the estimate
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProbe;

impl MemoryProbe for NoopProbe {
    fn resident_mb(&self) -> Option<f64> {
        None
    }

    fn handle_count(&self) -> Option<u64> {
        None
    }
}

type CountFn = Box<dyn Fn() -> Result<usize> + Send + Sync>;
type LivenessFn = Box<dyn Fn() -> bool + Send + Sync>;

/// Memory trend monitor
pub struct MemoryTrendMonitor {
    config: MonitorConfig,
    probe: Arc<dyn MemoryProbe>,
    snapshots: Mutex<VecDeque<MemorySnapshot>>,
    tracked_objects: Mutex<HashMap<String, LivenessFn>>,
    tracked_collections: Mutex<HashMap<String, CountFn>>,
    auto_task: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryTrendMonitor {
    /// Create a monitor, rejecting invalid configuration
    pub fn new(config: MonitorConfig, probe: Arc<dyn MemoryProbe>) -> Result<Self> {
        ConfigLoader::validate_monitor(&config)?;
        Ok(Self {
            snapshots: Mutex::new(VecDeque::with_capacity(config.max_snapshots)),
            config,
            probe,
            tracked_objects: Mutex::new(HashMap::new()),
            tracked_collections: Mutex::new(HashMap::new()),
            auto_task: Mutex::new(None),
        })
    }

    /// Monitor using `/proc/self` when available
    pub fn with_host_probe(config: MonitorConfig) -> Result<Self> {
        Self::new(config, Arc::new(ProcfsProbe::default()))
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Track an object without keeping it alive
    ///
    /// Snapshots report `1` while something else still holds the object and
    /// `0` once it has been dropped.
    pub fn track_object<T>(&self, name: &str, object: &Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        let weak: Weak<T> = Arc::downgrade(object);
        self.tracked_objects
            .lock()
            .insert(name.to_string(), Box::new(move || weak.strong_count() > 0));
    }

    /// Track a collection through a count function
    ///
    /// A count function that fails is reported as `-1` for that snapshot only.
    pub fn track_collection<F>(&self, name: &str, count: F)
    where
        F: Fn() -> Result<usize> + Send + Sync + 'static,
    {
        self.tracked_collections
            .lock()
            .insert(name.to_string(), Box::new(count));
    }

    /// Stop tracking an object or collection
    pub fn untrack(&self, name: &str) -> bool {
        let object = self.tracked_objects.lock().remove(name).is_some();
        let collection = self.tracked_collections.lock().remove(name).is_some();
        object || collection
    }

    /// Current value of every tracked object and collection
    pub fn tracked_counts(&self) -> BTreeMap<String, i64> {
        let mut counts = BTreeMap::new();

        for (name, count) in self.tracked_collections.lock().iter() {
            let value = match count() {
                Ok(n) => n as i64,
                Err(e) => {
                    debug!("Tracked collection '{}' unavailable: {}", name, e);
                    UNAVAILABLE
                }
            };
            counts.insert(name.clone(), value);
        }

        for (name, alive) in self.tracked_objects.lock().iter() {
            counts.insert(name.clone(), i64::from(alive()));
        }

        counts
    }

    fn estimate_mb(&self, tracked: &BTreeMap<String, i64>) -> f64 {
        if let Some(resident) = self.probe.resident_mb() {
            return resident;
        }
        let items: i64 = tracked.values().filter(|v| **v > 0).sum();
        self.config.base_overhead_mb + items as f64 * self.config.per_item_kb / 1024.0
    }

    /// Sample memory now and append the snapshot
    pub fn take_snapshot(&self) -> MemorySnapshot {
        let tracked = self.tracked_counts();
        let snapshot = MemorySnapshot {
            timestamp: Utc::now(),
            estimated_memory_mb: self.estimate_mb(&tracked),
            tracked_objects: tracked,
            handle_count: self.probe.handle_count(),
        };
        self.record_snapshot(snapshot.clone());
        snapshot
    }

    /// Append an externally produced snapshot
    ///
    /// Snapshots are kept in chronological order; the oldest are dropped once
    /// `max_snapshots` is exceeded.
    pub fn record_snapshot(&self, snapshot: MemorySnapshot) {
        {
            let mut snapshots = self.snapshots.lock();
            let position = snapshots
                .iter()
                .rposition(|s| s.timestamp <= snapshot.timestamp)
                .map(|i| i + 1)
                .unwrap_or(0);
            snapshots.insert(position, snapshot);
            while snapshots.len() > self.config.max_snapshots {
                snapshots.pop_front();
            }
        }

        let trend = self.analyze_trend();
        if trend.potential_leak {
            warn!(
                "Potential memory leak: {:.2} MB/min ({} severity). {}",
                trend.growth_rate_mb_per_minute, trend.leak_severity, trend.recommendation
            );
        }
    }

    pub fn snapshots(&self) -> Vec<MemorySnapshot> {
        self.snapshots.lock().iter().cloned().collect()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn clear(&self) {
        self.snapshots.lock().clear();
    }

    /// Fit a linear trend through the retained snapshots
    pub fn analyze_trend(&self) -> MemoryTrend {
        let points: Vec<(DateTime<Utc>, f64)> = self
            .snapshots
            .lock()
            .iter()
            .map(|s| (s.timestamp, s.estimated_memory_mb))
            .collect();

        if points.len() < 2 {
            return MemoryTrend {
                current_mb: points.last().map(|p| p.1).unwrap_or(0.0),
                average_mb: points.last().map(|p| p.1).unwrap_or(0.0),
                growth_rate_mb_per_minute: 0.0,
                potential_leak: false,
                leak_severity: LeakSeverity::None,
                recommendation: "Insufficient data: at least 2 snapshots are needed for trend analysis"
                    .to_string(),
            };
        }

        let origin = points[0].0;
        let series: Vec<(f64, f64)> = points
            .iter()
            .map(|(ts, mb)| ((*ts - origin).num_milliseconds() as f64, *mb))
            .collect();

        let slope_mb_per_ms = linear_regression_slope(&series);
        let growth_rate = slope_mb_per_ms * 60_000.0;
        let severity = classify_growth(growth_rate, self.config.leak_threshold_mb_per_minute);

        let current_mb = series[series.len() - 1].1;
        let average_mb = series.iter().map(|p| p.1).sum::<f64>() / series.len() as f64;

        MemoryTrend {
            current_mb,
            average_mb,
            growth_rate_mb_per_minute: growth_rate,
            potential_leak: severity != LeakSeverity::None,
            leak_severity: severity,
            recommendation: recommendation_for(severity, growth_rate),
        }
    }

    /// Diagnostics report over the retained snapshots
    pub fn generate_report(&self) -> MemoryReport {
        let trend = self.analyze_trend();
        let latest = self.snapshots.lock().back().cloned();
        let tracked = self.tracked_counts();

        let mut warnings = Vec::new();
        if trend.potential_leak {
            warnings.push(format!(
                "Memory growing at {:.2} MB/min ({} severity)",
                trend.growth_rate_mb_per_minute, trend.leak_severity
            ));
        }
        for (name, count) in &tracked {
            if *count == UNAVAILABLE {
                warnings.push(format!("Tracked collection '{}' could not be read", name));
            }
        }
        if let Some(previous) = self.previous_snapshot() {
            for (name, count) in &tracked {
                if let Some(before) = previous.tracked_objects.get(name) {
                    if *before > 0 && *count >= before * 2 && *count - before >= 10 {
                        warnings.push(format!(
                            "Tracked collection '{}' doubled since the previous snapshot ({} -> {})",
                            name, before, count
                        ));
                    }
                }
            }
        }

        MemoryReport {
            generated_at: Utc::now(),
            snapshot_count: self.snapshot_count(),
            trend,
            latest,
            tracked,
            warnings,
        }
    }

    fn previous_snapshot(&self) -> Option<MemorySnapshot> {
        let snapshots = self.snapshots.lock();
        let len = snapshots.len();
        if len >= 2 {
            snapshots.get(len - 2).cloned()
        } else {
            None
        }
    }

    /// Start taking snapshots every `snapshot_interval_ms`
    ///
    /// The task holds only a weak reference to the monitor and exits once the
    /// monitor is dropped. Returns `false` without a tokio runtime.
    pub fn start_auto_snapshot(self: &Arc<Self>) -> bool {
        let mut slot = self.auto_task.lock();
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return true;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                debug!("No tokio runtime available, auto snapshots not started");
                return false;
            }
        };

        let monitor = Arc::downgrade(self);
        let period = self.config.snapshot_interval();
        *slot = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.take_snapshot();
            }
        }));

        info!(
            "Memory auto snapshot started (every {} ms)",
            self.config.snapshot_interval_ms
        );
        true
    }

    /// Stop automatic snapshots. Idempotent.
    pub fn stop_auto_snapshot(&self) {
        if let Some(task) = self.auto_task.lock().take() {
            task.abort();
            info!("Memory auto snapshot stopped");
        }
    }

    pub fn auto_snapshot_running(&self) -> bool {
        self.auto_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for MemoryTrendMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.auto_task.get_mut().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for MemoryTrendMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTrendMonitor")
            .field("config", &self.config)
            .field("snapshots", &self.snapshot_count())
            .field("tracked_objects", &self.tracked_objects.lock().len())
            .field("tracked_collections", &self.tracked_collections.lock().len())
            .finish()
    }
}

/// Ordinary least-squares slope of `y` against `x`
///
/// Returns 0 when the slope is undefined (fewer than two points or all `x` equal).
pub fn linear_regression_slope(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.0).sum();
    let sum_y: f64 = points.iter().map(|p| p.1).sum();
    let sum_xy: f64 = points.iter().map(|p| p.0 * p.1).sum();
    let sum_xx: f64 = points.iter().map(|p| p.0 * p.0).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Classify a growth rate against the leak threshold `L`
pub fn classify_growth(growth_rate: f64, threshold: f64) -> LeakSeverity {
    if growth_rate > threshold * 3.0 {
        LeakSeverity::High
    } else if growth_rate > threshold * 2.0 {
        LeakSeverity::Medium
    } else if growth_rate > threshold {
        LeakSeverity::Low
    } else {
        LeakSeverity::None
    }
}

fn recommendation_for(severity: LeakSeverity, growth_rate: f64) -> String {
    match severity {
        LeakSeverity::High => format!(
            "Immediate action required: memory is growing at {:.2} MB/min. Stop background timers and clear caches, then inspect tracked collections for unbounded growth.",
            growth_rate
        ),
        LeakSeverity::Medium => format!(
            "Investigate soon: sustained growth of {:.2} MB/min. Check eviction settings and session cleanup.",
            growth_rate
        ),
        LeakSeverity::Low => format!(
            "Monitor: mild growth of {:.2} MB/min, possibly a warming cache.",
            growth_rate
        ),
        LeakSeverity::None => "Memory usage is stable".to_string(),
    }
}
