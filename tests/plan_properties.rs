//! 模型计划的整体性质测试

use proptest::prelude::*;
use rolecast_core::{
    build_dynamic_model_plan, provider_of, AgentRole, DiscoveredModel, EngineVersion, ExternalSignal,
    ExternalSignalMap, ModelStatus, PinnedTier, PlanError, PlannerConfig, ProviderToggles, ResolutionLayer,
    SignalSource, UNIVERSAL_DEFAULT_MODEL,
};
use std::collections::HashSet;

fn model(full_id: &str) -> DiscoveredModel {
    DiscoveredModel::from_full_id(full_id)
        .unwrap()
        .with_limits(200_000, 32_000)
        .with_capabilities(true, true, false)
}

fn mixed_catalog() -> Vec<DiscoveredModel> {
    vec![
        model("openai/gpt-5.3-codex"),
        model("openai/gpt-5.1-codex-mini"),
        model("anthropic/claude-opus-4-6"),
        model("anthropic/claude-haiku-4-5"),
        model("chutes/kimi-k2.5"),
        model("chutes/minimax-m2.1"),
        model("opencode/glm-4.7-free"),
        model("opencode/big-pickle"),
    ]
}

fn mixed_config() -> PlannerConfig {
    PlannerConfig::new()
        .with_providers(ProviderToggles {
            openai: true,
            anthropic: true,
            chutes: true,
            ..Default::default()
        })
        .with_opencode_free(true, PinnedTier::new(Some("opencode/glm-4.7-free"), None))
}

fn signals() -> ExternalSignalMap {
    let mut map = ExternalSignalMap::new();
    map.insert(
        "openai/gpt-5.3-codex".to_string(),
        ExternalSignal::new(SignalSource::ArtificialAnalysis)
            .with_quality(72.0)
            .with_coding(68.0)
            .with_latency(2.5),
    );
    map.insert(
        "anthropic/claude-opus-4-6".to_string(),
        ExternalSignal::new(SignalSource::Merged)
            .with_quality(75.0)
            .with_prices(Some(15.0), Some(75.0)),
    );
    map
}

#[test]
fn test_plan_is_deterministic() {
    let signals = signals();
    for version in [EngineVersion::V1, EngineVersion::V2, EngineVersion::V2Shadow] {
        let first = build_dynamic_model_plan(&mixed_catalog(), &mixed_config(), Some(&signals), Some(version)).unwrap();
        let second = build_dynamic_model_plan(&mixed_catalog(), &mixed_config(), Some(&signals), Some(version)).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}

#[test]
fn test_shadow_applies_v1() {
    let signals = signals();
    let v1 = build_dynamic_model_plan(&mixed_catalog(), &mixed_config(), Some(&signals), Some(EngineVersion::V1)).unwrap();
    let shadow =
        build_dynamic_model_plan(&mixed_catalog(), &mixed_config(), Some(&signals), Some(EngineVersion::V2Shadow)).unwrap();

    assert_eq!(shadow.agents, v1.agents);
    assert_eq!(shadow.chains, v1.chains);
    assert_eq!(shadow.provenance, v1.provenance);

    let diffs = shadow.scoring.diffs.as_ref().unwrap();
    assert_eq!(diffs.len(), 6);
    for role in AgentRole::ALL {
        let diff = &diffs[&role];
        assert!(diff.v1_top_model.is_some());
        assert!(diff.v2_top_model.is_some());
    }
}

#[test]
fn test_engine_version_from_config() {
    let config = mixed_config().with_engine_version(EngineVersion::V2);
    let plan = build_dynamic_model_plan(&mixed_catalog(), &config, None, None).unwrap();
    assert_eq!(plan.scoring.engine_version_applied, EngineVersion::V2);
    assert!(!plan.scoring.shadow_compared);

    let plan = build_dynamic_model_plan(&mixed_catalog(), &config, None, Some(EngineVersion::V1)).unwrap();
    assert_eq!(plan.scoring.engine_version_applied, EngineVersion::V1);
}

#[test]
fn test_free_only_plan() {
    let catalog = vec![
        model("opencode/glm-4.7-free"),
        model("opencode/minimax-m2.1-free"),
        model("openai/gpt-5.3-codex"),
    ];
    let config = PlannerConfig::new().with_opencode_free(true, PinnedTier::default());
    let plan = build_dynamic_model_plan(&catalog, &config, None, None).unwrap();

    for role in AgentRole::ALL {
        let model = plan.model_for(role).unwrap();
        assert_eq!(provider_of(model), "opencode");
        let chain = &plan.chains[&role];
        assert_eq!(chain.last().map(String::as_str), Some(UNIVERSAL_DEFAULT_MODEL));
        assert!(chain.iter().all(|m| !m.starts_with("openai/")));
    }
}

#[test]
fn test_no_enabled_provider_is_error() {
    let config = PlannerConfig::new().with_providers(ProviderToggles {
        google: true,
        ..Default::default()
    });
    let err = build_dynamic_model_plan(&mixed_catalog(), &config, None, None).unwrap_err();
    assert!(matches!(err, PlanError::NoEligibleModels));
    assert_eq!(String::from(err), "没有可用的候选模型，请启用更多 Provider");
}

#[test]
fn test_models_without_toolcall_are_not_primary() {
    let catalog = vec![
        model("openai/gpt-5.3-codex"),
        DiscoveredModel::from_full_id("openai/gpt-5.4-preview")
            .unwrap()
            .with_limits(1_000_000, 128_000)
            .with_capabilities(true, false, true),
        model("anthropic/claude-sonnet-4-5"),
        model("anthropic/claude-opus-4-6").with_status(ModelStatus::Deprecated),
    ];
    let config = PlannerConfig::new().with_providers(ProviderToggles {
        openai: true,
        anthropic: true,
        ..Default::default()
    });
    let plan = build_dynamic_model_plan(&catalog, &config, None, None).unwrap();

    for role in AgentRole::ALL {
        let model = plan.model_for(role).unwrap();
        assert_ne!(model, "anthropic/claude-opus-4-6");
        if role.requires_toolcall() {
            assert_ne!(model, "openai/gpt-5.4-preview");
        }
    }
}

#[test]
fn test_six_providers_each_take_one_role() {
    let catalog = vec![
        model("openai/gpt-5.3-codex"),
        model("anthropic/claude-opus-4-6"),
        model("github-copilot/grok-code-fast-1"),
        model("zai-coding-plan/glm-4.7"),
        model("kimi-for-coding/k2p5"),
        model("google/gemini-3-pro"),
    ];
    let config = PlannerConfig::new().with_providers(ProviderToggles {
        openai: true,
        anthropic: true,
        copilot: true,
        zai_plan: true,
        kimi: true,
        google: true,
        ..Default::default()
    });
    let plan = build_dynamic_model_plan(&catalog, &config, None, None).unwrap();

    let usage = plan.provider_usage();
    for provider_id in [
        "openai",
        "anthropic",
        "github-copilot",
        "zai-coding-plan",
        "kimi-for-coding",
        "google",
    ] {
        assert_eq!(usage.get(provider_id), 1, "{provider_id}");
    }
}

#[test]
fn test_user_layers_are_never_adjusted() {
    let config = mixed_config()
        .with_balance_provider_usage(true)
        .with_direct_override(AgentRole::Fixer, "openai/gpt-5.1-codex-mini")
        .with_pinned_model(AgentRole::Explorer, "chutes/kimi-k2.5");
    let plan = build_dynamic_model_plan(&mixed_catalog(), &config, None, None).unwrap();

    assert_eq!(plan.model_for(AgentRole::Fixer), Some("openai/gpt-5.1-codex-mini"));
    assert_eq!(
        plan.provenance[&AgentRole::Fixer].winner_layer,
        ResolutionLayer::DirectOverride
    );
    assert_eq!(plan.model_for(AgentRole::Explorer), Some("chutes/kimi-k2.5"));
    assert_eq!(
        plan.provenance[&AgentRole::Explorer].winner_layer,
        ResolutionLayer::PinnedModel
    );
}

#[test]
fn test_saved_config_reproduces_plan() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = mixed_config()
        .with_balance_provider_usage(true)
        .with_engine_version(EngineVersion::V2Shadow);

    for name in ["config.json", "config.yaml"] {
        let path = dir.path().join(name);
        rolecast::save_config(&path, &config).unwrap();
        let loaded = rolecast::load_config(&path).unwrap();
        assert_eq!(loaded, config);

        let expected = build_dynamic_model_plan(&mixed_catalog(), &config, None, None).unwrap();
        let actual = build_dynamic_model_plan(&mixed_catalog(), &loaded, None, None).unwrap();
        assert_eq!(actual, expected);
    }
}

fn catalog_strategy() -> impl Strategy<Value = Vec<DiscoveredModel>> {
    let pool = vec![
        "openai/gpt-5.3-codex",
        "openai/gpt-5.1-codex-mini",
        "openai/gpt-4.1",
        "anthropic/claude-opus-4-6",
        "anthropic/claude-sonnet-4-5",
        "anthropic/claude-haiku-4-5",
        "google/gemini-3-pro",
        "google/gemini-3-flash",
        "chutes/kimi-k2.5",
        "chutes/minimax-m2.1",
        "chutes/qwen3-coder-480b",
        "opencode/glm-4.7-free",
        "opencode/big-pickle",
    ];
    (proptest::sample::subsequence(pool, 1..13), any::<bool>()).prop_map(|(ids, toolcall)| {
        ids.into_iter()
            .enumerate()
            .map(|(i, id)| {
                DiscoveredModel::from_full_id(id)
                    .unwrap()
                    .with_limits(128_000 + i as u64 * 8_000, 32_000)
                    .with_capabilities(i % 2 == 0, toolcall || i % 3 != 0, false)
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_chains_are_well_formed(catalog in catalog_strategy(), balance in any::<bool>()) {
        let config = PlannerConfig::new()
            .with_providers(ProviderToggles {
                openai: true,
                anthropic: true,
                google: true,
                chutes: true,
                ..Default::default()
            })
            .with_opencode_free(true, PinnedTier::default())
            .with_balance_provider_usage(balance);

        let Ok(plan) = build_dynamic_model_plan(&catalog, &config, None, None) else {
            return Ok(());
        };

        prop_assert_eq!(plan.agents.len(), 6);
        for role in AgentRole::ALL {
            let model = plan.model_for(role).unwrap();
            let chain = &plan.chains[&role];
            prop_assert!(!chain.is_empty() && chain.len() <= 10);
            prop_assert_eq!(chain.last().map(String::as_str), Some(UNIVERSAL_DEFAULT_MODEL));
            prop_assert!(chain.iter().any(|m| m == model));
            let unique: HashSet<&String> = chain.iter().collect();
            prop_assert_eq!(unique.len(), chain.len());
            prop_assert!(!model.contains("qwen3"));
        }
    }
}
