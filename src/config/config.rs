use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 每个缓存映射的最大条目数
    pub max_entries: usize,
    /// 条目自最后访问起的存活时间（毫秒）
    pub ttl_ms: u64,
    /// 淘汰任务的执行间隔（毫秒）
    pub eviction_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl_ms: 30 * 60 * 1000,
            eviction_interval_ms: 5 * 60 * 1000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_millis(self.eviction_interval_ms)
    }
}

/// 内存趋势监控配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 自动快照间隔（毫秒）
    pub snapshot_interval_ms: u64,
    /// 环形缓冲区保留的快照数量
    pub max_snapshots: usize,
    /// 泄漏阈值（MB/分钟）
    pub leak_threshold_mb_per_minute: f64,
    /// 无宿主内存信息时的基础开销估计（MB）
    pub base_overhead_mb: f64,
    /// 每个被跟踪条目的估计开销（KB）
    pub per_item_kb: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_ms: 30_000,
            max_snapshots: 100,
            leak_threshold_mb_per_minute: 1.0,
            base_overhead_mb: 10.0,
            per_item_kb: 1.0,
        }
    }
}

impl MonitorConfig {
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化（JSON）日志格式
    pub structured: bool,
    /// 日志文件目录，None 时只输出到 stderr
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: None,
        }
    }
}

/// 学习速率：缓存的预测模型向观测结果靠拢的速度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum LearningRate {
    #[display("conservative")]
    Conservative,
    #[default]
    #[display("moderate")]
    Moderate,
    #[display("aggressive")]
    Aggressive,
}

impl LearningRate {
    pub fn factor(self) -> f64 {
        match self {
            LearningRate::Conservative => 0.1,
            LearningRate::Moderate => 0.25,
            LearningRate::Aggressive => 0.5,
        }
    }
}

/// 预测时间范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum PredictionHorizon {
    #[display("daily")]
    Daily,
    #[default]
    #[display("weekly")]
    Weekly,
    #[display("monthly")]
    Monthly,
}

impl PredictionHorizon {
    pub fn days(self) -> u32 {
        match self {
            PredictionHorizon::Daily => 1,
            PredictionHorizon::Weekly => 7,
            PredictionHorizon::Monthly => 30,
        }
    }
}

/// 个性化深度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum PersonalizationDepth {
    #[display("basic")]
    Basic,
    #[default]
    #[display("advanced")]
    Advanced,
    #[display("deep")]
    Deep,
}

impl PersonalizationDepth {
    /// 每条建议携带的行动步骤上限
    pub fn max_action_steps(self) -> usize {
        match self {
            PersonalizationDepth::Basic => 1,
            PersonalizationDepth::Advanced => 3,
            PersonalizationDepth::Deep => 5,
        }
    }
}

/// 文化敏感度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum CulturalSensitivity {
    #[display("standard")]
    Standard,
    #[default]
    #[display("enhanced")]
    Enhanced,
    #[display("adaptive")]
    Adaptive,
}

/// 干预风格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum InterventionStyle {
    #[default]
    #[display("gentle")]
    Gentle,
    #[display("direct")]
    Direct,
    #[display("collaborative")]
    Collaborative,
}

/// 隐私级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    #[default]
    #[display("standard")]
    Standard,
    #[display("enhanced")]
    Enhanced,
    #[display("maximum")]
    Maximum,
}

/// 共情智能配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpathyIntelligenceConfig {
    pub learning_rate: LearningRate,
    pub prediction_horizon: PredictionHorizon,
    pub personalization_depth: PersonalizationDepth,
    pub cultural_sensitivity: CulturalSensitivity,
    pub intervention_style: InterventionStyle,
    pub privacy_level: PrivacyLevel,
}

impl EmpathyIntelligenceConfig {
    /// 最高隐私级别下不缓存任何按用户派生的模式
    pub fn allows_user_caching(&self) -> bool {
        self.privacy_level != PrivacyLevel::Maximum
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 缓存配置
    pub cache: CacheConfig,
    /// 内存监控配置
    pub monitor: MonitorConfig,
    /// 共情智能配置
    pub intelligence: EmpathyIntelligenceConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            cache: CacheConfig::default(),
            monitor: MonitorConfig::default(),
            intelligence: EmpathyIntelligenceConfig::default(),
            logging: LoggingConfig {
                level: "debug".into(),
                structured: false,
                log_dir: None,
            },
            app_name: "solace".into(),
            environment: "development".into(),
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config.logging.log_dir = Some(PathBuf::from("./logs"));
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_usable() {
        let config = AppConfig::default();
        assert!(config.cache.max_entries >= 1);
        assert!(config.cache.ttl_ms > 0);
        assert_eq!(config.intelligence.prediction_horizon.days(), 7);
        assert!(config.intelligence.allows_user_caching());
    }

    #[test]
    fn test_production_overrides() {
        let config = AppConfig::production();
        assert_eq!(config.environment, "production");
        assert!(config.logging.structured);
        assert!(config.logging.log_dir.is_some());
    }

    #[test]
    fn test_enum_serde_names() {
        let json = serde_json::to_string(&PrivacyLevel::Maximum).unwrap();
        assert_eq!(json, "\"maximum\"");
        let parsed: InterventionStyle = serde_json::from_str("\"collaborative\"").unwrap();
        assert_eq!(parsed, InterventionStyle::Collaborative);
        assert_eq!(LearningRate::Aggressive.to_string(), "aggressive");
    }
}
