//! 错误类型模块
//!
//! ## 模块结构
//! - `plan_error`: 规划相关错误（PlanError, ConfigError）

pub mod plan_error;

pub use plan_error::{ConfigError, ConfigResult, PlanError, PlanResult};
