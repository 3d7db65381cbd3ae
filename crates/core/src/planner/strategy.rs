//! 评分引擎 trait
//!
//! 定义两套评分引擎共用的候选结构、资格标记、排序规则和引擎版本开关。

use super::model::DiscoveredModel;
use super::recency::RecencyMap;
use super::role::AgentRole;
use super::signals::ExternalSignalMap;
use super::strategies::{FeatureVector, FeatureVectorEngine, HeuristicEngine};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 评分引擎版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EngineVersion {
    /// 启发式加分引擎
    #[default]
    #[serde(rename = "v1")]
    V1,
    /// 特征向量引擎
    #[serde(rename = "v2")]
    V2,
    /// 应用 v1，同时记录 v2 的首选结果用于对比
    #[serde(rename = "v2-shadow")]
    V2Shadow,
}

impl EngineVersion {
    /// 实际用于分配的引擎
    pub fn applied(&self) -> EngineVersion {
        match self {
            EngineVersion::V2 => EngineVersion::V2,
            EngineVersion::V1 | EngineVersion::V2Shadow => EngineVersion::V1,
        }
    }

    /// 是否需要影子对比
    pub fn is_shadow(&self) -> bool {
        matches!(self, EngineVersion::V2Shadow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineVersion::V1 => "v1",
            EngineVersion::V2 => "v2",
            EngineVersion::V2Shadow => "v2-shadow",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "v1" => Some(EngineVersion::V1),
            "v2" => Some(EngineVersion::V2),
            "v2-shadow" | "shadow" => Some(EngineVersion::V2Shadow),
            _ => None,
        }
    }
}

impl std::fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 候选资格
///
/// 变体顺序即排序优先级：合格 < 已弃用 < 缺少工具调用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Eligibility {
    Eligible,
    Deprecated,
    MissingToolcall,
}

impl Eligibility {
    /// 按角色与模型判定资格，工具调用要求优先于弃用状态
    pub fn evaluate(role: AgentRole, model: &DiscoveredModel) -> Self {
        if role.requires_toolcall() && !model.toolcall {
            Eligibility::MissingToolcall
        } else if model.status == super::model::ModelStatus::Deprecated {
            Eligibility::Deprecated
        } else {
            Eligibility::Eligible
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    /// 不合格候选在启发式引擎中的固定分数
    pub fn floor_score(&self) -> Option<f64> {
        match self {
            Eligibility::Eligible => None,
            Eligibility::Deprecated => Some(-5_000.0),
            Eligibility::MissingToolcall => Some(-10_000.0),
        }
    }
}

/// 评分明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "kebab-case")]
pub enum ScoreBreakdown {
    /// 启发式引擎：角色分与外部信号加成
    #[serde(rename_all = "camelCase")]
    Heuristic {
        base_score: f64,
        external_signal_boost: f64,
    },
    /// 特征向量引擎：原始特征与加权后的特征
    #[serde(rename_all = "camelCase")]
    FeatureVector {
        features: FeatureVector,
        weighted: FeatureVector,
    },
}

/// 某个角色下已评分的候选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub model: DiscoveredModel,
    pub total_score: f64,
    pub eligibility: Eligibility,
    pub breakdown: ScoreBreakdown,
}

impl ScoredCandidate {
    pub fn model_id(&self) -> &str {
        &self.model.model
    }

    pub fn provider_id(&self) -> &str {
        &self.model.provider_id
    }

    pub fn is_eligible(&self) -> bool {
        self.eligibility.is_eligible()
    }
}

/// 评分上下文
///
/// 评分只依赖角色、模型、引擎以及这里的外部信号和版本加分。
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringContext<'a> {
    /// 外部信号
    pub signals: Option<&'a ExternalSignalMap>,
    /// 目录级版本加分
    pub recency: Option<&'a RecencyMap>,
}

impl<'a> ScoringContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置外部信号
    pub fn with_signals(mut self, signals: Option<&'a ExternalSignalMap>) -> Self {
        self.signals = signals;
        self
    }

    /// 设置版本加分表
    pub fn with_recency(mut self, recency: &'a RecencyMap) -> Self {
        self.recency = Some(recency);
        self
    }

    /// 模型的版本加分，缺失为 0
    pub fn recency_for(&self, model: &DiscoveredModel) -> f64 {
        self.recency
            .and_then(|map| map.get(&model.model).copied())
            .unwrap_or(0.0)
    }
}

/// 评分引擎 trait
///
/// 引擎是纯函数：相同输入必然得到相同分数。
pub trait ScoringEngine: Send + Sync {
    /// 引擎版本
    fn version(&self) -> EngineVersion;

    /// 引擎显示名称
    fn display_name(&self) -> &str;

    /// 为单个候选评分
    fn score(&self, model: &DiscoveredModel, role: AgentRole, ctx: &ScoringContext<'_>) -> ScoredCandidate;

    /// 为所有候选评分并排序
    fn rank(
        &self,
        models: &[DiscoveredModel],
        role: AgentRole,
        ctx: &ScoringContext<'_>,
    ) -> Vec<ScoredCandidate> {
        let mut ranked: Vec<ScoredCandidate> = models
            .iter()
            .map(|model| self.score(model, role, ctx))
            .collect();
        ranked.sort_by(compare_candidates);
        ranked
    }
}

/// 候选排序：资格、总分降序、Provider ID、完整模型 ID
pub fn compare_candidates(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    a.eligibility
        .cmp(&b.eligibility)
        .then_with(|| b.total_score.total_cmp(&a.total_score))
        .then_with(|| a.model.provider_id.cmp(&b.model.provider_id))
        .then_with(|| a.model.model.cmp(&b.model.model))
}

/// 获取版本对应的实际引擎
pub fn engine_for(version: EngineVersion) -> Box<dyn ScoringEngine> {
    match version.applied() {
        EngineVersion::V2 => Box::new(FeatureVectorEngine::new()),
        _ => Box::new(HeuristicEngine::new()),
    }
}

/// 保留三位小数
pub(crate) fn round_score(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::model::ModelStatus;

    fn candidate(full_id: &str, score: f64, eligibility: Eligibility) -> ScoredCandidate {
        ScoredCandidate {
            model: DiscoveredModel::from_full_id(full_id).unwrap(),
            total_score: score,
            eligibility,
            breakdown: ScoreBreakdown::Heuristic {
                base_score: score,
                external_signal_boost: 0.0,
            },
        }
    }

    #[test]
    fn test_engine_version_serde_and_applied() {
        let version: EngineVersion = serde_json::from_str("\"v2-shadow\"").unwrap();
        assert_eq!(version, EngineVersion::V2Shadow);
        assert_eq!(version.applied(), EngineVersion::V1);
        assert!(version.is_shadow());
        assert_eq!(EngineVersion::V2.applied(), EngineVersion::V2);
        assert_eq!(EngineVersion::parse("V2"), Some(EngineVersion::V2));
        assert_eq!(EngineVersion::parse(" shadow "), Some(EngineVersion::V2Shadow));
        assert_eq!(EngineVersion::parse("v3"), None);
        assert_eq!(engine_for(EngineVersion::V2Shadow).version(), EngineVersion::V1);
    }

    #[test]
    fn test_eligibility_evaluation() {
        let no_tools = DiscoveredModel::new("openai", "gpt-5").with_capabilities(true, false, false);
        assert_eq!(
            Eligibility::evaluate(AgentRole::Fixer, &no_tools),
            Eligibility::MissingToolcall
        );
        assert_eq!(
            Eligibility::evaluate(AgentRole::Oracle, &no_tools),
            Eligibility::Eligible
        );

        let deprecated = no_tools.clone().with_status(ModelStatus::Deprecated);
        assert_eq!(
            Eligibility::evaluate(AgentRole::Designer, &deprecated),
            Eligibility::Deprecated
        );
        assert_eq!(
            Eligibility::evaluate(AgentRole::Explorer, &deprecated),
            Eligibility::MissingToolcall
        );
    }

    #[test]
    fn test_compare_candidates_orders_eligibility_first() {
        let mut list = vec![
            candidate("zai-coding-plan/glm-4.7", 50.0, Eligibility::Eligible),
            candidate("openai/gpt-old", 500.0, Eligibility::Deprecated),
            candidate("openai/gpt-5", 50.0, Eligibility::Eligible),
            candidate("anthropic/claude", 90.0, Eligibility::Eligible),
            candidate("openai/no-tools", 900.0, Eligibility::MissingToolcall),
        ];
        list.sort_by(compare_candidates);

        let ids: Vec<&str> = list.iter().map(|c| c.model_id()).collect();
        assert_eq!(
            ids,
            vec![
                "anthropic/claude",
                "openai/gpt-5",
                "zai-coding-plan/glm-4.7",
                "openai/gpt-old",
                "openai/no-tools",
            ]
        );
    }

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(1.23456), 1.235);
        assert_eq!(round_score(-0.0004), -0.0);
    }
}
