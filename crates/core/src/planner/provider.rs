//! Provider 常量
//!
//! 已知 Provider 的 ID、免费档 / 聚合 Provider 标识以及评分时使用的 Provider 偏置。

pub const OPENAI: &str = "openai";
pub const ANTHROPIC: &str = "anthropic";
pub const GITHUB_COPILOT: &str = "github-copilot";
pub const ZAI_CODING_PLAN: &str = "zai-coding-plan";
pub const KIMI_FOR_CODING: &str = "kimi-for-coding";
pub const GOOGLE: &str = "google";
/// 多租户聚合 Provider，承载结构上不同的底层模型
pub const CHUTES: &str = "chutes";
/// 免费档 Provider
pub const OPENCODE: &str = "opencode";

/// 所有降级链最终兜底的通用默认模型
pub const UNIVERSAL_DEFAULT_MODEL: &str = "opencode/big-pickle";

/// 是否为免费档 Provider
pub fn is_free_tier(provider_id: &str) -> bool {
    provider_id == OPENCODE
}

/// 完整模型 ID 是否属于免费档
pub fn is_free_tier_model(full_id: &str) -> bool {
    full_id.starts_with("opencode/")
}

/// 是否为聚合 Provider
pub fn is_aggregator(provider_id: &str) -> bool {
    provider_id == CHUTES
}

/// 启发式评分中的 Provider 偏置
pub fn provider_bias(provider_id: &str) -> f64 {
    match provider_id {
        OPENAI | ANTHROPIC => 3.0,
        KIMI_FOR_CODING | GOOGLE | CHUTES => 2.0,
        GITHUB_COPILOT => 1.0,
        ZAI_CODING_PLAN => 0.0,
        OPENCODE => -2.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_tier_detection() {
        assert!(is_free_tier("opencode"));
        assert!(!is_free_tier("chutes"));
        assert!(is_free_tier_model(UNIVERSAL_DEFAULT_MODEL));
        assert!(!is_free_tier_model("openai/gpt-5-nano"));
    }

    #[test]
    fn test_provider_bias() {
        assert_eq!(provider_bias(OPENAI), 3.0);
        assert_eq!(provider_bias(OPENCODE), -2.0);
        assert_eq!(provider_bias("unknown"), 0.0);
    }
}
