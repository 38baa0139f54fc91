use crate::config::config::{AppConfig, CacheConfig, MonitorConfig};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::PathBuf;

const ENV_PREFIX: &str = "SOLACE_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序：
    /// 1. 内置默认值
    /// 2. ./solace.toml
    /// 3. 环境变量（SOLACE_CACHE__MAX_ENTRIES=200）
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: PathBuf) -> Result<AppConfig, figment::Error> {
        Self::figment(path).extract()
    }

    /// 加载缓存配置
    pub fn load_cache_config() -> Result<CacheConfig, figment::Error> {
        Self::figment(default_config_path()).extract_inner("cache")
    }

    /// 加载监控配置
    pub fn load_monitor_config() -> Result<MonitorConfig, figment::Error> {
        Self::figment(default_config_path()).extract_inner("monitor")
    }

    fn figment(path: PathBuf) -> Figment {
        // 字段名本身带下划线，嵌套层级用双下划线分隔
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        Self::validate_cache(&config.cache)?;
        Self::validate_monitor(&config.monitor)?;
        Ok(())
    }

    /// 验证缓存配置
    pub fn validate_cache(cache: &CacheConfig) -> Result<(), ConfigValidationError> {
        if cache.max_entries < 1 {
            return Err(ConfigValidationError::InvalidMaxEntries);
        }

        if cache.ttl_ms == 0 {
            return Err(ConfigValidationError::InvalidTtl);
        }

        if cache.eviction_interval_ms == 0 {
            return Err(ConfigValidationError::InvalidEvictionInterval);
        }

        Ok(())
    }

    /// 验证监控配置
    pub fn validate_monitor(monitor: &MonitorConfig) -> Result<(), ConfigValidationError> {
        if monitor.max_snapshots < 2 {
            return Err(ConfigValidationError::InvalidSnapshotLimit);
        }

        if monitor.snapshot_interval_ms == 0 {
            return Err(ConfigValidationError::InvalidSnapshotInterval);
        }

        if !monitor.leak_threshold_mb_per_minute.is_finite()
            || monitor.leak_threshold_mb_per_minute <= 0.0
        {
            return Err(ConfigValidationError::InvalidLeakThreshold);
        }

        if monitor.base_overhead_mb < 0.0 || monitor.per_item_kb < 0.0 {
            return Err(ConfigValidationError::InvalidEstimate);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigValidationError {
    #[error("缓存 max_entries 无效，必须大于等于 1")]
    InvalidMaxEntries,

    #[error("缓存 ttl_ms 无效，必须大于 0")]
    InvalidTtl,

    #[error("缓存 eviction_interval_ms 无效，必须大于 0")]
    InvalidEvictionInterval,

    #[error("max_snapshots 无效，至少需要 2 个快照才能计算趋势")]
    InvalidSnapshotLimit,

    #[error("snapshot_interval_ms 无效，必须大于 0")]
    InvalidSnapshotInterval,

    #[error("泄漏阈值无效，必须为正数")]
    InvalidLeakThreshold,

    #[error("内存估计参数无效，不能为负数")]
    InvalidEstimate,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("solace.toml")
}

/// 检查配置文件是否存在
pub fn config_exists() -> bool {
    default_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigLoader::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_zero_max_entries() {
        let mut config = AppConfig::default();
        config.cache.max_entries = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidMaxEntries)
        );
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let cache = CacheConfig {
            ttl_ms: 0,
            ..Default::default()
        };
        assert_eq!(
            ConfigLoader::validate_cache(&cache),
            Err(ConfigValidationError::InvalidTtl)
        );
    }

    #[test]
    fn test_rejects_non_positive_leak_threshold() {
        let monitor = MonitorConfig {
            leak_threshold_mb_per_minute: 0.0,
            ..Default::default()
        };
        assert_eq!(
            ConfigLoader::validate_monitor(&monitor),
            Err(ConfigValidationError::InvalidLeakThreshold)
        );
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                    app_name = "solace-test"

                    [cache]
                    max_entries = 7
                    ttl_ms = 1000

                    [intelligence]
                    privacy_level = "maximum"
                "#,
            )?;
            jail.set_env("SOLACE_CACHE__EVICTION_INTERVAL_MS", "250");

            let config = ConfigLoader::load_from(PathBuf::from("custom.toml"))?;
            assert_eq!(config.app_name, "solace-test");
            assert_eq!(config.cache.max_entries, 7);
            assert_eq!(config.cache.ttl_ms, 1000);
            assert_eq!(config.cache.eviction_interval_ms, 250);
            assert!(!config.intelligence.allows_user_caching());
            // 未指定的字段保留默认值
            assert_eq!(config.monitor.max_snapshots, 100);
            Ok(())
        });
    }
}
