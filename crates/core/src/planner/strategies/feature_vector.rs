//! 特征向量评分引擎（v2）
//!
//! 把模型归一化为固定的特征向量，按角色权重线性加权求和。
//! 每个候选都附带完整的特征与加权明细，便于解释排序结果。

use crate::planner::model::{DiscoveredModel, ModelStatus};
use crate::planner::provider;
use crate::planner::role::AgentRole;
use crate::planner::signals::find_signal;
use crate::planner::strategy::{
    round_score, Eligibility, EngineVersion, ScoreBreakdown, ScoredCandidate, ScoringContext,
    ScoringEngine,
};
use crate::planner::tokens::{mentions_kimi_k25, mentions_minimax_m21, mentions_qwen3};
use serde::{Deserialize, Serialize};

/// 特征向量，同一结构也用作权重与加权结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FeatureVector {
    pub status: f64,
    pub context: f64,
    pub output: f64,
    pub version_bonus: f64,
    pub reasoning: f64,
    pub toolcall: f64,
    pub attachment: f64,
    pub quality: f64,
    pub coding: f64,
    pub latency_penalty: f64,
    pub price_penalty: f64,
}

/// 特征权重
pub type FeatureWeights = FeatureVector;

impl FeatureVector {
    /// 逐项乘以权重
    pub fn weighted(&self, weights: &FeatureWeights) -> FeatureVector {
        FeatureVector {
            status: self.status * weights.status,
            context: self.context * weights.context,
            output: self.output * weights.output,
            version_bonus: self.version_bonus * weights.version_bonus,
            reasoning: self.reasoning * weights.reasoning,
            toolcall: self.toolcall * weights.toolcall,
            attachment: self.attachment * weights.attachment,
            quality: self.quality * weights.quality,
            coding: self.coding * weights.coding,
            latency_penalty: self.latency_penalty * weights.latency_penalty,
            price_penalty: self.price_penalty * weights.price_penalty,
        }
    }

    /// 各项之和
    pub fn sum(&self) -> f64 {
        self.status
            + self.context
            + self.output
            + self.version_bonus
            + self.reasoning
            + self.toolcall
            + self.attachment
            + self.quality
            + self.coding
            + self.latency_penalty
            + self.price_penalty
    }
}

const BASE_WEIGHTS: FeatureWeights = FeatureWeights {
    status: 22.0,
    context: 6.0,
    output: 6.0,
    version_bonus: 8.0,
    reasoning: 10.0,
    toolcall: 16.0,
    attachment: 2.0,
    quality: 14.0,
    coding: 18.0,
    latency_penalty: -3.0,
    price_penalty: -2.0,
};

/// 角色权重（基础权重 + 角色覆盖）
pub fn feature_weights(role: AgentRole) -> FeatureWeights {
    match role {
        AgentRole::Orchestrator => FeatureWeights {
            reasoning: 22.0,
            toolcall: 22.0,
            quality: 16.0,
            coding: 16.0,
            latency_penalty: -2.0,
            ..BASE_WEIGHTS
        },
        AgentRole::Oracle => FeatureWeights {
            reasoning: 26.0,
            quality: 20.0,
            coding: 18.0,
            latency_penalty: -2.0,
            output: 7.0,
            ..BASE_WEIGHTS
        },
        AgentRole::Designer => FeatureWeights {
            attachment: 12.0,
            output: 10.0,
            quality: 16.0,
            coding: 10.0,
            ..BASE_WEIGHTS
        },
        AgentRole::Explorer => FeatureWeights {
            latency_penalty: -8.0,
            toolcall: 24.0,
            reasoning: 2.0,
            context: 4.0,
            output: 4.0,
            ..BASE_WEIGHTS
        },
        AgentRole::Librarian => FeatureWeights {
            context: 14.0,
            output: 10.0,
            quality: 18.0,
            coding: 14.0,
            ..BASE_WEIGHTS
        },
        AgentRole::Fixer => FeatureWeights {
            coding: 28.0,
            toolcall: 22.0,
            reasoning: 12.0,
            output: 10.0,
            ..BASE_WEIGHTS
        },
    }
}

fn status_value(status: ModelStatus) -> f64 {
    match status {
        ModelStatus::Active => 1.0,
        ModelStatus::Beta => 0.4,
        ModelStatus::Alpha => -0.25,
        ModelStatus::Deprecated => -1.0,
    }
}

fn capability(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// 家族先验：聚合 Provider 上的 qwen3 降权，kimi-k2.5 与 minimax-m2.1 加权
///
/// 三者互斥，按 qwen3、kimi、minimax 的顺序取第一个命中的。
fn family_adjustment(role: AgentRole, model: &DiscoveredModel) -> f64 {
    let text = model.search_text();
    let aggregator = provider::is_aggregator(&model.provider_id);

    if aggregator && mentions_qwen3(&text) {
        return match role {
            AgentRole::Orchestrator | AgentRole::Oracle | AgentRole::Explorer => -6.0,
            AgentRole::Designer => -8.0,
            AgentRole::Librarian | AgentRole::Fixer => -12.0,
        };
    }
    if mentions_kimi_k25(&text) {
        return match role {
            AgentRole::Orchestrator | AgentRole::Oracle => 1.0,
            AgentRole::Explorer | AgentRole::Librarian => 2.0,
            AgentRole::Designer | AgentRole::Fixer => 3.0,
        };
    }
    if aggregator && mentions_minimax_m21(&text) {
        return match role {
            AgentRole::Orchestrator | AgentRole::Oracle => 1.0,
            AgentRole::Designer => 2.0,
            AgentRole::Explorer | AgentRole::Librarian | AgentRole::Fixer => 4.0,
        };
    }
    0.0
}

/// 提取特征向量
pub fn extract_feature_vector(
    model: &DiscoveredModel,
    role: AgentRole,
    ctx: &ScoringContext<'_>,
) -> FeatureVector {
    let signal = find_signal(model, ctx.signals);
    let latency = signal.and_then(|s| s.finite_latency()).unwrap_or(0.0);
    let price = signal.map(|s| s.blended_price()).unwrap_or(0.0);

    let output = if role == AgentRole::Designer {
        if model.output_limit < 64_000 {
            -1.0
        } else {
            0.0
        }
    } else {
        model.output_limit.min(300_000) as f64 / 30_000.0
    };
    let latency_multiplier = if role == AgentRole::Explorer { 1.4 } else { 1.0 };

    FeatureVector {
        status: status_value(model.status),
        context: model.context_limit.min(1_000_000) as f64 / 100_000.0,
        output,
        version_bonus: family_adjustment(role, model) + ctx.recency_for(model) / 12.0,
        reasoning: capability(model.reasoning),
        toolcall: capability(model.toolcall),
        attachment: capability(model.attachment),
        quality: signal.and_then(|s| s.quality_score).unwrap_or(0.0) / 100.0,
        coding: signal.and_then(|s| s.coding_score).unwrap_or(0.0) / 100.0,
        latency_penalty: latency.min(20.0) * latency_multiplier,
        price_penalty: price.min(50.0) / 10.0,
    }
}

/// 特征向量评分引擎
pub struct FeatureVectorEngine;

impl FeatureVectorEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FeatureVectorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoringEngine for FeatureVectorEngine {
    fn version(&self) -> EngineVersion {
        EngineVersion::V2
    }

    fn display_name(&self) -> &str {
        "特征向量评分"
    }

    fn score(&self, model: &DiscoveredModel, role: AgentRole, ctx: &ScoringContext<'_>) -> ScoredCandidate {
        let features = extract_feature_vector(model, role, ctx);
        let weighted = features.weighted(&feature_weights(role));

        ScoredCandidate {
            model: model.clone(),
            total_score: round_score(weighted.sum()),
            eligibility: Eligibility::evaluate(role, model),
            breakdown: ScoreBreakdown::FeatureVector { features, weighted },
        }
    }
}
