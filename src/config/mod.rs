//! 配置管理模块
//!
//! 提供引擎配置的加载和校验，支持 TOML 配置文件和环境变量覆盖。

pub mod config;
pub mod loader;

pub use config::{
    AppConfig, CacheConfig, CulturalSensitivity, EmpathyIntelligenceConfig, InterventionStyle,
    LearningRate, LoggingConfig, MonitorConfig, PersonalizationDepth, PredictionHorizon,
    PrivacyLevel,
};
pub use loader::{ConfigLoader, ConfigValidationError};
