//! 服务模块

pub mod cache;
pub mod cache_store;
pub mod engine;
pub mod memory_monitor;
pub mod predictive;
pub mod scoring;
pub mod session_cache;
pub mod wisdom;

pub use cache_store::{BoundedCacheStore, CacheField, EvictionReport, MAX_WISDOM_PER_USER};
pub use engine::{
    EmpathyEngine, EmpathyMetricsService, MAX_INSIGHTS, MAX_RECOMMENDATIONS, assemble_metrics,
    create_empathy_engine,
};
pub use memory_monitor::{MemoryProbe, MemoryTrendMonitor, NoopProbe, ProcfsProbe};
pub use predictive::{build_predictive_model, calculate_trend, calculate_variance};
pub use scoring::{KeywordTextScorer, TextScorer, TextSignals};
pub use session_cache::{SessionCacheStats, SessionScopedCache};
pub use wisdom::{MAX_WISDOM_INSIGHTS, extract_wisdom};
