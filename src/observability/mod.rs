//! 可观测性模块
//!
//! 提供 Prometheus 指标和结构化日志。

use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::LoggingConfig;
use crate::error::{AppError, Result};

// ===== Engine Metrics =====

/// 引擎指标
///
/// 每个引擎实例持有独立的注册表，多个实例（例如测试中）互不冲突。
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    pub computations_total: IntCounter,
    pub session_cache_hits_total: IntCounter,
    pub insights_total: IntCounter,
    pub recommendations_total: IntCounter,
    pub evictions_total: IntCounter,
    pub snapshots_total: IntCounter,
    pub cached_entries: IntGauge,
    pub estimated_memory_mb: Gauge,
}

impl EngineMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("solace".to_string()), None)?;

        let computations_total = IntCounter::with_opts(Opts::new(
            "metrics_computations_total",
            "Empathy metrics snapshots computed",
        ))?;
        let session_cache_hits_total = IntCounter::with_opts(Opts::new(
            "session_cache_hits_total",
            "Snapshots served from a session cache",
        ))?;
        let insights_total = IntCounter::with_opts(Opts::new("insights_total", "Insights generated"))?;
        let recommendations_total =
            IntCounter::with_opts(Opts::new("recommendations_total", "Recommendations generated"))?;
        let evictions_total = IntCounter::with_opts(Opts::new(
            "cache_evictions_total",
            "Cache entries removed by eviction passes",
        ))?;
        let snapshots_total =
            IntCounter::with_opts(Opts::new("memory_snapshots_total", "Memory reports generated"))?;
        let cached_entries = IntGauge::with_opts(Opts::new("cached_entries", "Entries in the per-user caches"))?;
        let estimated_memory_mb =
            Gauge::with_opts(Opts::new("estimated_memory_mb", "Latest estimated memory usage in MB"))?;

        registry.register(Box::new(computations_total.clone()))?;
        registry.register(Box::new(session_cache_hits_total.clone()))?;
        registry.register(Box::new(insights_total.clone()))?;
        registry.register(Box::new(recommendations_total.clone()))?;
        registry.register(Box::new(evictions_total.clone()))?;
        registry.register(Box::new(snapshots_total.clone()))?;
        registry.register(Box::new(cached_entries.clone()))?;
        registry.register(Box::new(estimated_memory_mb.clone()))?;

        Ok(Self {
            registry,
            computations_total,
            session_cache_hits_total,
            insights_total,
            recommendations_total,
            evictions_total,
            snapshots_total,
            cached_entries,
            estimated_memory_mb,
        })
    }

    /// 记录一次指标计算
    pub fn record_computation(&self, cached_entries: usize) {
        self.computations_total.inc();
        self.cached_entries.set(cached_entries as i64);
    }

    pub fn record_session_hit(&self) {
        self.session_cache_hits_total.inc();
    }

    pub fn record_insights(&self, count: usize) {
        self.insights_total.inc_by(count as u64);
    }

    pub fn record_recommendations(&self, count: usize) {
        self.recommendations_total.inc_by(count as u64);
    }

    /// 记录淘汰结果并刷新缓存条目数
    pub fn record_eviction(&self, removed: usize, cached_entries: usize) {
        self.evictions_total.inc_by(removed as u64);
        self.cached_entries.set(cached_entries as i64);
    }

    pub fn record_memory(&self, estimated_mb: f64) {
        self.snapshots_total.inc();
        self.estimated_memory_mb.set(estimated_mb);
    }

    /// 生成 Prometheus 文本格式指标
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| AppError::Metrics(e.to_string()))
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics")
            .field("computations_total", &self.computations_total.get())
            .field("cached_entries", &self.cached_entries.get())
            .field("estimated_memory_mb", &self.estimated_memory_mb.get())
            .finish()
    }
}

// ===== Structured Logging =====

/// 初始化结构化日志
///
/// `RUST_LOG` 优先于配置中的级别。配置了日志目录时按天滚动写入文件，
/// 返回的 guard 必须在进程退出前一直持有，否则缓冲中的日志会丢失。
/// 已经安装过全局 subscriber 时不做任何事。
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "solace.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_target(true)
        .with_line_number(true);

    let installed = if config.structured {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed, keeping the existing one");
    }

    guard
}
