//! 启发式评分引擎（v1）
//!
//! 手工调校的加分模型：基础分 + 角色项 + 外部信号加成。

use crate::planner::model::{DiscoveredModel, ModelStatus};
use crate::planner::provider::{self, provider_bias};
use crate::planner::role::AgentRole;
use crate::planner::signals::{find_signal, ExternalSignalMap};
use crate::planner::strategy::{
    round_score, Eligibility, EngineVersion, ScoreBreakdown, ScoredCandidate, ScoringContext,
    ScoringEngine,
};
use crate::planner::tokens::{
    has_code_token, has_deep_token, has_fast_token, has_flash_token, is_zai_glm47,
    mentions_gemini_25_pro, mentions_kimi_k25, mentions_minimax_m21, mentions_qwen3,
};

/// 启发式评分引擎
pub struct HeuristicEngine;

impl HeuristicEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HeuristicEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn status_score(status: ModelStatus) -> f64 {
    match status {
        ModelStatus::Active => 20.0,
        ModelStatus::Beta => 8.0,
        ModelStatus::Alpha => -5.0,
        ModelStatus::Deprecated => -40.0,
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// 与角色无关的基础分
pub fn base_score(model: &DiscoveredModel, recency: f64) -> f64 {
    let text = model.search_text();
    let context = model.context_limit.min(1_000_000) as f64 / 50_000.0;
    let output = model.output_limit.min(300_000) as f64 / 30_000.0;

    status_score(model.status)
        + context
        + output
        + flag(has_deep_token(&text)) * 12.0
        + flag(has_fast_token(&text)) * 4.0
        + flag(has_code_token(&text)) * 12.0
        + recency
        + flag(model.toolcall) * 25.0
}

/// 聚合 Provider 上的家族偏好
fn aggregator_adjustment(role: AgentRole, model: &DiscoveredModel, text: &str) -> f64 {
    if !provider::is_aggregator(&model.provider_id) {
        return 0.0;
    }

    // (qwen3 惩罚, kimi-k2.5 加分, minimax-m2.1 加分)
    let (qwen_penalty, kimi_bonus, minimax_bonus) = match role {
        AgentRole::Oracle => (-12.0, 0.0, 0.0),
        AgentRole::Orchestrator => (-10.0, 0.0, 0.0),
        AgentRole::Fixer => (-22.0, 8.0, 10.0),
        AgentRole::Designer => (-14.0, 6.0, 3.0),
        AgentRole::Librarian => (-18.0, 5.0, 9.0),
        AgentRole::Explorer => (-10.0, 4.0, 12.0),
    };

    flag(mentions_qwen3(text)) * qwen_penalty
        + flag(mentions_kimi_k25(text)) * kimi_bonus
        + flag(mentions_minimax_m21(text)) * minimax_bonus
}

fn gemini_adjustment(text: &str) -> f64 {
    if mentions_gemini_25_pro(text) {
        -14.0
    } else {
        0.0
    }
}

/// 角色分（不含外部信号）
///
/// 不合格候选直接返回对应的固定分数。
pub fn role_score(role: AgentRole, model: &DiscoveredModel, recency: f64) -> (f64, Eligibility) {
    let eligibility = Eligibility::evaluate(role, model);
    if let Some(floor) = eligibility.floor_score() {
        return (floor, eligibility);
    }

    let text = model.search_text();
    let reasoning = flag(model.reasoning);
    let toolcall = flag(model.toolcall);
    let attachment = flag(model.attachment);
    let context = model.context_limit.min(1_000_000) as f64 / 60_000.0;
    let output = model.output_limit.min(300_000) as f64 / 40_000.0;
    let deep = flag(has_deep_token(&text));
    let fast = flag(has_fast_token(&text));
    let code = flag(has_code_token(&text));

    let flash = has_flash_token(model);
    let zai47 = is_zai_glm47(model);
    let zai_flash = zai47 && flash;
    let zai_full = zai47 && !flash;
    let non_reasoning_flash = if flash && !model.reasoning { -16.0 } else { 0.0 };

    let shared = base_score(model, recency)
        + gemini_adjustment(&text)
        + aggregator_adjustment(role, model, &text)
        + provider_bias(&model.provider_id);

    let flash_adjustment = |flash_value: f64, other: f64| if flash { flash_value } else { other };
    let zai_adjustment = |full: f64, flash_variant: f64| {
        if zai_full {
            full
        } else if zai_flash {
            flash_variant
        } else {
            0.0
        }
    };

    let role_term = match role {
        AgentRole::Orchestrator => {
            reasoning * 40.0 + toolcall * 25.0 + deep * 10.0 + code * 8.0 + context
                + flash_adjustment(-22.0, 0.0)
                + zai_adjustment(16.0, -18.0)
                + non_reasoning_flash
        }
        AgentRole::Oracle => {
            reasoning * 55.0 + deep * 18.0 + context * 1.2 + toolcall * 10.0
                + flash_adjustment(-34.0, 0.0)
                + zai_adjustment(16.0, -18.0)
                + non_reasoning_flash
        }
        AgentRole::Designer => {
            attachment * 25.0 + reasoning * 18.0 + toolcall * 15.0 + context * 0.8 + output
                + flash_adjustment(-8.0, 0.0)
                + zai_adjustment(10.0, -8.0)
        }
        AgentRole::Explorer => {
            fast * 68.0 + toolcall * 28.0 + reasoning * 2.0 + context * 0.2
                + flash_adjustment(26.0, -10.0)
                + zai_adjustment(2.0, 6.0)
                - deep * 18.0
        }
        AgentRole::Librarian => {
            context * 30.0 + toolcall * 22.0 + reasoning * 15.0 + output * 10.0
                + flash_adjustment(-12.0, 0.0)
                + zai_adjustment(16.0, -18.0)
        }
        AgentRole::Fixer => {
            code * 28.0 + toolcall * 24.0 + fast * 18.0 + reasoning * 14.0 + output * 8.0
                + flash_adjustment(-18.0, 0.0)
                + zai_adjustment(16.0, -18.0)
                + non_reasoning_flash
        }
    };

    (shared + role_term, eligibility)
}

/// 外部信号加成
///
/// explorer 强烈惩罚高延迟和低质量，其余角色以质量与代码能力为主。
pub fn external_signal_boost(
    role: AgentRole,
    model: &DiscoveredModel,
    signals: Option<&ExternalSignalMap>,
) -> f64 {
    let Some(signal) = find_signal(model, signals) else {
        return 0.0;
    };

    let quality = signal.quality_score.unwrap_or(0.0);
    let coding = signal.coding_score.unwrap_or(0.0);
    let price = signal.blended_price();
    let latency = signal.finite_latency();

    if role == AgentRole::Explorer {
        let latency_penalty = latency
            .map(|seconds| {
                let step = if seconds > 7.0 {
                    16.0
                } else if seconds > 4.0 {
                    10.0
                } else {
                    0.0
                };
                seconds.min(12.0) * 3.2 + step
            })
            .unwrap_or(0.0);
        let quality_floor_penalty = if quality > 0.0 && quality < 35.0 {
            (35.0 - quality) * 0.8
        } else {
            0.0
        };
        let boost = quality * 0.05 + coding * 0.08
            - latency_penalty
            - price.min(30.0) * 0.03
            - quality_floor_penalty;
        return boost.clamp(-90.0, 25.0);
    }

    let latency_penalty = latency.map(|seconds| seconds.min(25.0) * 0.22).unwrap_or(0.0);
    let boost = quality * 0.16 + coding * 0.24 - latency_penalty - price.min(30.0) * 0.08;
    boost.clamp(-30.0, 45.0)
}

impl ScoringEngine for HeuristicEngine {
    fn version(&self) -> EngineVersion {
        EngineVersion::V1
    }

    fn display_name(&self) -> &str {
        "启发式评分"
    }

    fn score(&self, model: &DiscoveredModel, role: AgentRole, ctx: &ScoringContext<'_>) -> ScoredCandidate {
        let (base, eligibility) = role_score(role, model, ctx.recency_for(model));
        let boost = if eligibility.is_eligible() {
            external_signal_boost(role, model, ctx.signals)
        } else {
            0.0
        };

        ScoredCandidate {
            model: model.clone(),
            total_score: round_score(base + boost),
            eligibility,
            breakdown: ScoreBreakdown::Heuristic {
                base_score: round_score(base),
                external_signal_boost: round_score(boost),
            },
        }
    }
}
