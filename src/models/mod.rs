//! 核心数据模型模块
//!
//! 定义 Solace 的核心数据结构：日志条目、指标快照、洞察与建议、
//! 预测模型、会话句柄以及诊断数据。

pub mod diagnostics;
pub mod entry;
pub mod insight;
pub mod metrics;
pub mod pattern;
pub mod prediction;
pub mod session;

pub use diagnostics::*;
pub use entry::*;
pub use insight::*;
pub use metrics::*;
pub use pattern::*;
pub use prediction::*;
pub use session::{SessionContext, WeakSessionContext};
