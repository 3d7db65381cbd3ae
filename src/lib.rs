//! rolecast - 多 Agent 角色模型规划
//!
//! 把六个 Agent 角色分配到可用模型目录中最合适的模型，并为每个角色生成确定性的降级链。
//!
//! ## Workspace 结构
//!
//! - rolecast-core crate（规划引擎、配置、错误类型，纯同步无 I/O）
//! - rolecast-signals crate（模型目录发现、外部榜单信号拉取）
//! - 主 crate 提供日志初始化与 `PlanningService` 门面

pub use rolecast_core;
pub use rolecast_signals;

pub use rolecast_core::{
    build_dynamic_model_plan, load_config, save_config, AgentRole, DiscoveredModel, DynamicModelPlan, EngineVersion,
    PlanError, PlannerConfig,
};
pub use rolecast_signals::{CatalogDiscovery, SignalFetchReport, SignalOptions};

pub mod logger;
pub mod service;

pub use service::{PlanReport, PlanningService};
