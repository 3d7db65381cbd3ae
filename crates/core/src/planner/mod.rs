//! 角色模型规划模块
//!
//! 把六个 Agent 角色分配到模型目录中最合适的模型上。
//!
//! ## 模块结构
//!
//! - `role` - 角色定义与固定参数
//! - `model` / `provider` - 候选模型与 Provider 常量
//! - `normalize` / `signals` - 别名规范化与外部信号
//! - `recency` - 版本新旧加分
//! - `strategy` / `strategies` - 评分引擎 trait 与 v1 / v2 实现
//! - `reducer` - Provider 候选裁剪
//! - `selector` - 多样性感知的首选模型选择
//! - `fallback` - 降级链构建
//! - `precedence` - 六层优先级解析
//! - `balancer` - 零使用补救与订阅均衡
//! - `plan` - 完整计划生成

pub mod balancer;
pub mod fallback;
pub mod model;
pub mod normalize;
pub mod plan;
pub mod precedence;
pub mod provider;
pub mod recency;
pub mod reducer;
pub mod role;
pub mod selector;
pub mod signals;
pub mod strategies;
pub mod strategy;
pub(crate) mod tokens;

pub use balancer::{rebalance_for_subscription, rescue_unused_providers, RoleSlot, MAX_BALANCE_SCORE_LOSS};
pub use fallback::{
    build_fallback_chain, choose_provider_representative, dedupe_models, finalize_chain_with_tail,
    provider_bundle, RolePins, MAX_CHAIN_LEN,
};
pub use model::{provider_of, split_model_id, DiscoveredModel, ModelStatus};
pub use normalize::build_model_key_aliases;
pub use plan::{build_dynamic_model_plan, AgentAssignment, DynamicModelPlan, PlanScoring, ShadowDiff};
pub use precedence::{resolve_agent_with_precedence, AgentLayerInput, Provenance, ResolutionLayer, ResolvedAgent};
pub use provider::UNIVERSAL_DEFAULT_MODEL;
pub use recency::{version_recency_map, RecencyMap};
pub use reducer::{select_top_models_per_provider, MAX_CANDIDATES_PER_PROVIDER};
pub use role::AgentRole;
pub use selector::{diversity_adjusted_score, select_primary_with_diversity, ProviderTargets, ProviderUsage};
pub use signals::{find_signal, merge_into, merge_signal, ExternalSignal, ExternalSignalMap, SignalSource};
pub use strategies::*;
pub use strategy::{
    compare_candidates, engine_for, Eligibility, EngineVersion, ScoreBreakdown, ScoredCandidate, ScoringContext,
    ScoringEngine,
};
