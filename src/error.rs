//! 错误处理模块
//!
//! 定义引擎的错误类型。计算接口本身是全函数（退化输入返回基线分数），
//! 错误只出现在构造、配置加载、指标注册和 IO 路径上。

use thiserror::Error;

use crate::config::loader::ConfigValidationError;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 参数验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// 指标注册错误
    #[error("指标错误: {0}")]
    Metrics(String),

    /// 集合计数失败（被跟踪集合的计数函数）
    #[error("集合不可用: {0}")]
    CollectionUnavailable(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<ConfigValidationError> for AppError {
    fn from(e: ConfigValidationError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<prometheus::Error> for AppError {
    fn from(e: prometheus::Error) -> Self {
        AppError::Metrics(e.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_conversion() {
        let err: AppError = ConfigValidationError::InvalidMaxEntries.into();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("max_entries"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "entries.json");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Io(_)));
    }
}
