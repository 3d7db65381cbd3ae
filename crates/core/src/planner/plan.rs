//! 动态模型计划
//!
//! 串联整条流水线：补齐固定模型、按 Provider 过滤、候选裁剪、逐角色选择、
//! 降级链构建与优先级解析，最后执行补救与均衡。

use super::balancer::{rebalance_for_subscription, rescue_unused_providers, RoleSlot};
use super::fallback::{build_fallback_chain, dedupe_models};
use super::model::{provider_of, split_model_id, DiscoveredModel, ModelStatus};
use super::precedence::{resolve_agent_with_precedence, AgentLayerInput, Provenance, ResolutionLayer};
use super::provider;
use super::recency::version_recency_map;
use super::reducer::select_top_models_per_provider;
use super::role::AgentRole;
use super::selector::{select_primary_with_diversity, ProviderTargets, ProviderUsage};
use super::signals::ExternalSignalMap;
use super::strategies::FeatureVectorEngine;
use super::strategy::{engine_for, EngineVersion, ScoredCandidate, ScoringContext, ScoringEngine};
use super::tokens::is_excluded_aggregator_model;
use crate::config::PlannerConfig;
use crate::errors::{PlanError, PlanResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// 角色分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAssignment {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// 影子模式下两套引擎的首选模型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowDiff {
    #[serde(rename = "v1TopModel", default, skip_serializing_if = "Option::is_none")]
    pub v1_top_model: Option<String>,
    #[serde(rename = "v2TopModel", default, skip_serializing_if = "Option::is_none")]
    pub v2_top_model: Option<String>,
}

/// 计划的评分元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanScoring {
    /// 实际使用的引擎（v1 或 v2）
    pub engine_version_applied: EngineVersion,
    /// 是否做了影子对比
    pub shadow_compared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffs: Option<BTreeMap<AgentRole, ShadowDiff>>,
}

/// 动态模型计划，完全由输入决定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicModelPlan {
    pub agents: BTreeMap<AgentRole, AgentAssignment>,
    pub chains: BTreeMap<AgentRole, Vec<String>>,
    pub provenance: BTreeMap<AgentRole, Provenance>,
    pub scoring: PlanScoring,
}

impl DynamicModelPlan {
    /// 角色的最终模型
    pub fn model_for(&self, role: AgentRole) -> Option<&str> {
        self.agents.get(&role).map(|a| a.model.as_str())
    }

    /// 按最终模型统计每个 Provider 承担的角色数
    pub fn provider_usage(&self) -> ProviderUsage {
        ProviderUsage::from_models(self.agents.values().map(|a| a.model.as_str()))
    }
}

/// 为固定模型补一个合成条目，已存在或格式不合法时跳过
fn ensure_synthetic_model(models: &mut Vec<DiscoveredModel>, full_id: Option<&str>) {
    let Some(full_id) = full_id else {
        return;
    };
    if models.iter().any(|m| m.model == full_id) {
        return;
    }
    let Some((provider_id, model_id)) = split_model_id(full_id) else {
        return;
    };

    debug!("补充固定模型的合成条目: {}", full_id);
    models.push(
        DiscoveredModel::new(provider_id, model_id)
            .with_status(ModelStatus::Active)
            .with_limits(200_000, 32_000)
            .with_capabilities(true, true, false),
    );
}

/// 合并固定模型并过滤出启用 Provider 的候选
fn provider_universe(catalog: &[DiscoveredModel], config: &PlannerConfig) -> Vec<DiscoveredModel> {
    let mut models = catalog.to_vec();
    for pin in [
        config.chutes.primary.as_deref(),
        config.chutes.secondary.as_deref(),
        config.opencode_free.primary.as_deref(),
        config.opencode_free.secondary.as_deref(),
    ] {
        ensure_synthetic_model(&mut models, pin);
    }

    models
        .into_iter()
        .filter(|m| config.is_provider_enabled(&m.provider_id))
        .filter(|m| !is_excluded_aggregator_model(m))
        .collect()
}

/// 角色的用户层与动态层输入
fn layer_input(config: &PlannerConfig, role: AgentRole, dynamic_chain: Vec<String>, system_default: String) -> AgentLayerInput {
    let pins = config.role_pins(role);
    AgentLayerInput::new(system_default)
        .with_direct_override(config.direct_overrides.get(&role).cloned())
        .with_manual_user_plan(
            config
                .manual_plans
                .get(&role)
                .map(|plan| plan.models())
                .unwrap_or_default(),
        )
        .with_pinned_model(config.pinned_models.get(&role).cloned())
        .with_dynamic_recommendation(dynamic_chain)
        .with_provider_fallback_policy(pins.provider_policy())
}

/// 生成动态模型计划
///
/// `engine_override` 优先于配置中的引擎版本。按 Provider 过滤后没有候选时返回
/// [`PlanError::NoEligibleModels`]。
pub fn build_dynamic_model_plan(
    catalog: &[DiscoveredModel],
    config: &PlannerConfig,
    signals: Option<&ExternalSignalMap>,
    engine_override: Option<EngineVersion>,
) -> PlanResult<DynamicModelPlan> {
    config.validate()?;

    let version = engine_override.unwrap_or(config.scoring_engine_version);
    let universe = provider_universe(catalog, config);
    let recency = version_recency_map(&universe);
    let ctx = ScoringContext::new()
        .with_signals(signals)
        .with_recency(&recency);
    let engine = engine_for(version);

    let candidates = select_top_models_per_provider(&universe, engine.as_ref(), &ctx);
    if candidates.is_empty() {
        return Err(PlanError::NoEligibleModels);
    }

    let has_paid_provider = config.providers.has_paid_provider();
    let mut paid_providers = dedupe_models(
        candidates
            .iter()
            .map(|m| m.provider_id.as_str())
            .filter(|p| !provider::is_free_tier(p)),
    );
    paid_providers.sort();
    let targets = ProviderTargets::compute(&paid_providers);

    info!(
        "开始生成模型计划: 引擎 {}, 候选 {} 个, 付费 Provider {:?}",
        version,
        candidates.len(),
        paid_providers
    );

    let shadow_engine = FeatureVectorEngine::new();
    let mut diffs = BTreeMap::new();
    let mut usage = ProviderUsage::new();
    let mut slots: Vec<RoleSlot> = Vec::with_capacity(AgentRole::ASSIGNMENT_ORDER.len());

    for (index, role) in AgentRole::ASSIGNMENT_ORDER.iter().copied().enumerate() {
        let ranked = engine.rank(&candidates, role, &ctx);

        if version.is_shadow() {
            let shadow_ranked = shadow_engine.rank(&candidates, role, &ctx);
            diffs.insert(
                role,
                ShadowDiff {
                    v1_top_model: ranked.first().map(|c| c.model_id().to_string()),
                    v2_top_model: shadow_ranked.first().map(|c| c.model_id().to_string()),
                },
            );
        }

        let paid_pool: Vec<ScoredCandidate> = if has_paid_provider {
            ranked
                .iter()
                .filter(|c| !provider::is_free_tier(c.provider_id()))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        let primary_pool = if paid_pool.is_empty() { &ranked } else { &paid_pool };
        let remaining_slots = AgentRole::ASSIGNMENT_ORDER.len() - index;

        let Some(primary) = select_primary_with_diversity(primary_pool, role, &usage, &targets, remaining_slots)
            .or_else(|| ranked.first())
        else {
            continue;
        };

        let pins = config.role_pins(role);
        let dynamic_chain = build_fallback_chain(primary.model_id(), &ranked, role, &pins);
        let system_default = pins.system_default();
        let resolved = resolve_agent_with_precedence(&layer_input(
            config,
            role,
            dynamic_chain,
            system_default.clone(),
        ));

        let locked = resolved.provenance.winner_layer.is_user_layer();
        let mut slot = RoleSlot {
            role,
            model: resolved.model,
            chain: resolved.chain,
            provenance: resolved.provenance,
            ranked,
            pins,
            system_default,
            locked,
        };

        if !locked {
            if let Some(pin) = slot.pins.forced_for(&slot.model).map(str::to_string) {
                debug!("[{}] 使用固定模型 {} 替换 {}", role, pin, slot.model);
                slot.prepend_model(&pin, ResolutionLayer::ManualUserPlan);
            }
        }

        // 按最终模型计数（含用户层与固定模型替换），不是选择器给出的首选模型
        usage.increment(provider_of(&slot.model));
        debug!(
            "[{}] 选择 {} (来源 {}, 降级链 {} 项)",
            role,
            slot.model,
            slot.provenance.winner_layer,
            slot.chain.len()
        );
        slots.push(slot);
    }

    if has_paid_provider {
        rescue_unused_providers(&mut slots, &paid_providers);
        if config.balance_provider_usage {
            rebalance_for_subscription(&mut slots, &paid_providers, &targets);
        }
    }

    let mut plan = DynamicModelPlan {
        agents: BTreeMap::new(),
        chains: BTreeMap::new(),
        provenance: BTreeMap::new(),
        scoring: PlanScoring {
            engine_version_applied: version.applied(),
            shadow_compared: version.is_shadow(),
            diffs: version.is_shadow().then_some(diffs),
        },
    };
    for slot in slots {
        plan.agents.insert(
            slot.role,
            AgentAssignment {
                model: slot.model,
                variant: slot.role.variant().map(str::to_string),
            },
        );
        plan.chains.insert(slot.role, slot.chain);
        plan.provenance.insert(slot.role, slot.provenance);
    }

    info!(
        "模型计划生成完成: {} 个角色, Provider 分布 {:?}",
        plan.agents.len(),
        plan.provider_usage().iter().collect::<Vec<_>>()
    );
    Ok(plan)
}
