//! rolecast 核心库
//!
//! 角色模型规划引擎与配置。引擎是纯同步的，不做任何 I/O。

pub mod config;
pub mod errors;
pub mod planner;

pub use config::{
    default_config_path, load_config, save_config, ManualAgentPlan, PinnedTier, PlannerConfig, ProviderToggles,
};
pub use errors::{ConfigError, ConfigResult, PlanError, PlanResult};
pub use planner::*;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
