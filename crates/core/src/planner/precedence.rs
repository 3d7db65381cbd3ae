//! 优先级解析
//!
//! 六层静态覆盖阶梯，第一个非空的层胜出，不比较分数。

use super::fallback::{dedupe_models, MAX_CHAIN_LEN};
use serde::{Deserialize, Serialize};

/// 解析层，按优先级从高到低排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionLayer {
    /// 直接覆盖
    #[serde(rename = "opencode-direct-override")]
    DirectOverride,
    /// 用户手动计划
    ManualUserPlan,
    /// 固定模型
    PinnedModel,
    /// 动态推荐
    DynamicRecommendation,
    /// Provider 兜底策略
    ProviderFallbackPolicy,
    /// 系统默认
    SystemDefault,
}

impl ResolutionLayer {
    /// 按优先级排列的所有层
    pub const ORDER: [ResolutionLayer; 6] = [
        ResolutionLayer::DirectOverride,
        ResolutionLayer::ManualUserPlan,
        ResolutionLayer::PinnedModel,
        ResolutionLayer::DynamicRecommendation,
        ResolutionLayer::ProviderFallbackPolicy,
        ResolutionLayer::SystemDefault,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionLayer::DirectOverride => "opencode-direct-override",
            ResolutionLayer::ManualUserPlan => "manual-user-plan",
            ResolutionLayer::PinnedModel => "pinned-model",
            ResolutionLayer::DynamicRecommendation => "dynamic-recommendation",
            ResolutionLayer::ProviderFallbackPolicy => "provider-fallback-policy",
            ResolutionLayer::SystemDefault => "system-default",
        }
    }

    /// 是否为用户决定的层，这些层的结果不参与后续调整
    pub fn is_user_layer(&self) -> bool {
        matches!(
            self,
            ResolutionLayer::DirectOverride | ResolutionLayer::ManualUserPlan | ResolutionLayer::PinnedModel
        )
    }
}

impl std::fmt::Display for ResolutionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单个角色的各层输入
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentLayerInput {
    pub direct_override: Option<String>,
    pub manual_user_plan: Vec<String>,
    pub pinned_model: Option<String>,
    pub dynamic_recommendation: Vec<String>,
    pub provider_fallback_policy: Vec<String>,
    pub system_default: String,
}

impl AgentLayerInput {
    pub fn new(system_default: impl Into<String>) -> Self {
        Self {
            system_default: system_default.into(),
            ..Default::default()
        }
    }

    pub fn with_direct_override(mut self, model: Option<String>) -> Self {
        self.direct_override = model;
        self
    }

    pub fn with_manual_user_plan(mut self, models: Vec<String>) -> Self {
        self.manual_user_plan = models;
        self
    }

    pub fn with_pinned_model(mut self, model: Option<String>) -> Self {
        self.pinned_model = model;
        self
    }

    pub fn with_dynamic_recommendation(mut self, models: Vec<String>) -> Self {
        self.dynamic_recommendation = models;
        self
    }

    pub fn with_provider_fallback_policy(mut self, models: Vec<String>) -> Self {
        self.provider_fallback_policy = models;
        self
    }

    /// 指定层的模型列表，空字符串不计入
    fn layer(&self, layer: ResolutionLayer) -> Vec<&str> {
        let models: Vec<&str> = match layer {
            ResolutionLayer::DirectOverride => self.direct_override.iter().map(String::as_str).collect(),
            ResolutionLayer::ManualUserPlan => self.manual_user_plan.iter().map(String::as_str).collect(),
            ResolutionLayer::PinnedModel => self.pinned_model.iter().map(String::as_str).collect(),
            ResolutionLayer::DynamicRecommendation => {
                self.dynamic_recommendation.iter().map(String::as_str).collect()
            }
            ResolutionLayer::ProviderFallbackPolicy => {
                self.provider_fallback_policy.iter().map(String::as_str).collect()
            }
            ResolutionLayer::SystemDefault => vec![self.system_default.as_str()],
        };
        models.into_iter().filter(|m| !m.trim().is_empty()).collect()
    }
}

/// 胜出来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub winner_layer: ResolutionLayer,
    pub winner_model: String,
}

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAgent {
    pub model: String,
    pub chain: Vec<String>,
    pub provenance: Provenance,
}

/// 按优先级解析角色的最终模型与降级链
///
/// 降级链为胜出层及其以下各层的去重拼接，系统默认始终在末尾。
pub fn resolve_agent_with_precedence(input: &AgentLayerInput) -> ResolvedAgent {
    let winner = ResolutionLayer::ORDER
        .iter()
        .copied()
        .find(|layer| !input.layer(*layer).is_empty())
        .unwrap_or(ResolutionLayer::SystemDefault);

    let lower_layers = ResolutionLayer::ORDER
        .iter()
        .copied()
        .filter(|layer| *layer >= winner && *layer != ResolutionLayer::SystemDefault);
    let mut models: Vec<&str> = lower_layers.flat_map(|layer| input.layer(layer)).collect();
    let system_default = input.system_default.as_str();
    models.retain(|m| *m != system_default);
    models.push(system_default);

    let mut chain = dedupe_models(models);
    if chain.len() > MAX_CHAIN_LEN {
        chain.truncate(MAX_CHAIN_LEN - 1);
        chain.push(system_default.to_string());
    }
    let model = chain.first().cloned().unwrap_or_default();

    ResolvedAgent {
        provenance: Provenance {
            winner_layer: winner,
            winner_model: model.clone(),
        },
        model,
        chain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn full_input() -> AgentLayerInput {
        AgentLayerInput::new("opencode/big-pickle")
            .with_direct_override(Some("anthropic/claude-opus-4-6".to_string()))
            .with_manual_user_plan(vec!["openai/gpt-5.3-codex".to_string()])
            .with_pinned_model(Some("google/gemini-3-pro".to_string()))
            .with_dynamic_recommendation(vec![
                "openai/gpt-5.3-codex".to_string(),
                "chutes/kimi-k2.5".to_string(),
                "opencode/big-pickle".to_string(),
            ])
            .with_provider_fallback_policy(vec!["chutes/kimi-k2.5".to_string()])
    }

    #[test]
    fn test_direct_override_wins() {
        let resolved = resolve_agent_with_precedence(&full_input());
        assert_eq!(resolved.model, "anthropic/claude-opus-4-6");
        assert_eq!(resolved.provenance.winner_layer, ResolutionLayer::DirectOverride);
        assert_eq!(
            resolved.chain,
            vec![
                "anthropic/claude-opus-4-6",
                "openai/gpt-5.3-codex",
                "google/gemini-3-pro",
                "chutes/kimi-k2.5",
                "opencode/big-pickle",
            ]
        );
    }

    #[test]
    fn test_dynamic_layer_chain() {
        let input = AgentLayerInput::new("opencode/big-pickle")
            .with_dynamic_recommendation(vec!["openai/gpt-5.3-codex".to_string()])
            .with_provider_fallback_policy(vec!["chutes/kimi-k2.5".to_string()]);

        let resolved = resolve_agent_with_precedence(&input);
        assert_eq!(resolved.provenance.winner_layer, ResolutionLayer::DynamicRecommendation);
        assert_eq!(
            resolved.chain,
            vec!["openai/gpt-5.3-codex", "chutes/kimi-k2.5", "opencode/big-pickle"]
        );
    }

    #[test]
    fn test_system_default_alone() {
        let input = AgentLayerInput::new("opencode/big-pickle")
            .with_direct_override(Some("  ".to_string()))
            .with_manual_user_plan(vec![String::new()]);

        let resolved = resolve_agent_with_precedence(&input);
        assert_eq!(resolved.model, "opencode/big-pickle");
        assert_eq!(resolved.provenance.winner_layer, ResolutionLayer::SystemDefault);
        assert_eq!(resolved.chain, vec!["opencode/big-pickle"]);
    }

    #[test]
    fn test_chain_is_capped() {
        let dynamic: Vec<String> = (0..12).map(|i| format!("openai/gpt-{i}")).collect();
        let input = AgentLayerInput::new("opencode/big-pickle")
            .with_direct_override(Some("anthropic/claude-opus-4-6".to_string()))
            .with_dynamic_recommendation(dynamic);

        let resolved = resolve_agent_with_precedence(&input);
        assert_eq!(resolved.chain.len(), 10);
        assert_eq!(resolved.chain[0], "anthropic/claude-opus-4-6");
        assert_eq!(resolved.chain[8], "openai/gpt-7");
        assert_eq!(resolved.chain[9], "opencode/big-pickle");
    }

    #[test]
    fn test_layer_serialization() {
        let json = serde_json::to_string(&ResolutionLayer::DirectOverride).unwrap();
        assert_eq!(json, "\"opencode-direct-override\"");
        let json = serde_json::to_string(&ResolutionLayer::ProviderFallbackPolicy).unwrap();
        assert_eq!(json, "\"provider-fallback-policy\"");
        assert!(ResolutionLayer::PinnedModel.is_user_layer());
        assert!(!ResolutionLayer::DynamicRecommendation.is_user_layer());
    }

    fn model_id() -> impl Strategy<Value = String> {
        "[a-c]{1,2}/[a-d]{1,3}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_direct_override_always_wins(
            direct in model_id(),
            manual in prop::collection::vec(model_id(), 0..3),
            dynamic in prop::collection::vec(model_id(), 0..5),
        ) {
            let input = AgentLayerInput::new("opencode/big-pickle")
                .with_direct_override(Some(direct.clone()))
                .with_manual_user_plan(manual)
                .with_dynamic_recommendation(dynamic);
            let resolved = resolve_agent_with_precedence(&input);

            prop_assert_eq!(&resolved.model, &direct);
            prop_assert_eq!(resolved.provenance.winner_layer, ResolutionLayer::DirectOverride);
        }

        #[test]
        fn prop_chain_ends_in_system_default(
            dynamic in prop::collection::vec(model_id(), 0..6),
            policy in prop::collection::vec(model_id(), 0..3),
        ) {
            let input = AgentLayerInput::new("opencode/big-pickle")
                .with_dynamic_recommendation(dynamic)
                .with_provider_fallback_policy(policy);
            let resolved = resolve_agent_with_precedence(&input);

            prop_assert_eq!(resolved.chain.last().map(String::as_str), Some("opencode/big-pickle"));
            let unique: std::collections::HashSet<&String> = resolved.chain.iter().collect();
            prop_assert_eq!(unique.len(), resolved.chain.len());
        }
    }
}
