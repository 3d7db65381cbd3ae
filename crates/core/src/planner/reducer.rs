//! Provider 候选裁剪
//!
//! 排名前限制每个 Provider 的候选数量，控制后续搜索空间。

use super::model::DiscoveredModel;
use super::role::AgentRole;
use super::strategy::{ScoringContext, ScoringEngine};
use indexmap::IndexMap;
use tracing::debug;

/// 每个 Provider 保留的最大候选数
pub const MAX_CANDIDATES_PER_PROVIDER: usize = 2;

/// 模型在六个角色上的平均分
fn mean_role_score(engine: &dyn ScoringEngine, model: &DiscoveredModel, ctx: &ScoringContext<'_>) -> f64 {
    let total: f64 = AgentRole::ALL
        .iter()
        .map(|role| engine.score(model, *role, ctx).total_score)
        .sum();
    total / AgentRole::ALL.len() as f64
}

/// 每个 Provider 最多保留两个平均分最高的模型
///
/// 平均分相同按完整模型 ID 排序；Provider 保持首次出现的顺序，
/// 不超过上限的 Provider 原样保留。
pub fn select_top_models_per_provider(
    models: &[DiscoveredModel],
    engine: &dyn ScoringEngine,
    ctx: &ScoringContext<'_>,
) -> Vec<DiscoveredModel> {
    let mut by_provider: IndexMap<&str, Vec<&DiscoveredModel>> = IndexMap::new();
    for model in models {
        by_provider
            .entry(model.provider_id.as_str())
            .or_default()
            .push(model);
    }

    let mut selected = Vec::with_capacity(models.len());
    for (provider_id, provider_models) in by_provider {
        if provider_models.len() <= MAX_CANDIDATES_PER_PROVIDER {
            selected.extend(provider_models.into_iter().cloned());
            continue;
        }

        let mut scored: Vec<(f64, &DiscoveredModel)> = provider_models
            .into_iter()
            .map(|model| (mean_role_score(engine, model, ctx), model))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.model.cmp(&b.1.model)));

        debug!(
            "Provider {} 候选裁剪: {} -> {}",
            provider_id,
            scored.len(),
            MAX_CANDIDATES_PER_PROVIDER
        );
        selected.extend(
            scored
                .into_iter()
                .take(MAX_CANDIDATES_PER_PROVIDER)
                .map(|(_, model)| model.clone()),
        );
    }

    selected
}
