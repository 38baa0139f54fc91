//! Cache and memory diagnostics.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel reported for a size or count that could not be read.
pub const UNAVAILABLE: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub timestamp: DateTime<Utc>,
    pub estimated_memory_mb: f64,
    /// Tracked collection sizes and object liveness (`1`/`0`), `-1` when unreadable.
    pub tracked_objects: BTreeMap<String, i64>,
    /// Open handle count when the host exposes it.
    pub handle_count: Option<u64>,
}

impl MemorySnapshot {
    pub fn new(timestamp: DateTime<Utc>, estimated_memory_mb: f64) -> Self {
        Self {
            timestamp,
            estimated_memory_mb,
            tracked_objects: BTreeMap::new(),
            handle_count: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum LeakSeverity {
    #[display("none")]
    None,
    #[display("low")]
    Low,
    #[display("medium")]
    Medium,
    #[display("high")]
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryTrend {
    pub current_mb: f64,
    pub average_mb: f64,
    pub growth_rate_mb_per_minute: f64,
    pub potential_leak: bool,
    pub leak_severity: LeakSeverity,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryReport {
    pub generated_at: DateTime<Utc>,
    pub snapshot_count: usize,
    pub trend: MemoryTrend,
    pub latest: Option<MemorySnapshot>,
    pub tracked: BTreeMap<String, i64>,
    pub warnings: Vec<String>,
}

impl MemoryReport {
    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} snapshots, current {:.1} MB, avg {:.1} MB, growth {:+.2} MB/min, leak severity {}",
            self.snapshot_count,
            self.trend.current_mb,
            self.trend.average_mb,
            self.trend.growth_rate_mb_per_minute,
            self.trend.leak_severity,
        )
    }
}

/// Cache statistics. Map sizes are `-1` when the map could not be read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub user_patterns: i64,
    pub cultural_contexts: i64,
    pub wisdom_entries: i64,
    pub prediction_models: i64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(LeakSeverity::High > LeakSeverity::Medium);
        assert!(LeakSeverity::Low > LeakSeverity::None);
        assert_eq!(LeakSeverity::Medium.to_string(), "medium");
    }
}
