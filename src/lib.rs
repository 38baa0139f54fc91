//! Solace - 量化共情指标引擎
//!
//! 从疼痛与情绪日志中计算共情、情绪智力与韧性指标，生成洞察和个性化建议。
//! 按用户派生的状态保存在有界缓存中，会话级缓存由会话句柄自身持有，
//! 内存趋势监控用于发现缓存的持续增长。

pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod services;
