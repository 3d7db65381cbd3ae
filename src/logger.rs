//! 日志初始化
//!
//! 基于 tracing-subscriber 的 fmt 输出，重复初始化时忽略。

use std::str::FromStr;
use tracing::Level;

/// 默认日志级别
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// 解析日志级别，无法识别时使用默认级别
pub fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::INFO)
}

/// 初始化全局日志
///
/// 返回 false 表示已有全局 subscriber，本次初始化被忽略。
pub fn init_logging(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(false)
        .try_init()
        .is_ok()
}
