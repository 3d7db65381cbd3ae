//! 模型名称特征
//!
//! 基于模型 ID 与显示名称的正则特征，供两套评分引擎与选择器共用。

use super::model::DiscoveredModel;
use super::provider;
use regex::Regex;

/// 定义一个惰性编译的内置正则
///
/// 展开为返回 `&'static Regex` 的同名函数，调用方需依赖 `regex`。
#[macro_export]
macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static ::regex::Regex {
            static RE: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            RE.get_or_init(|| ::regex::Regex::new($pattern).expect("内置正则表达式无效"))
        }
    };
}

cached_regex!(deep_re, r"(?i)(opus|pro|thinking|reason|r1|gpt-5|k2\.5)");
cached_regex!(fast_re, r"(?i)(nano|flash|mini|lite|fast|turbo|haiku|small)");
cached_regex!(code_re, r"(?i)(codex|coder|code|dev|program)");
cached_regex!(flash_re, r"(?i)flash");
cached_regex!(glm47_re, r"(?i)glm-4\.7");
cached_regex!(kimi_k25_loose_re, r"(?i)kimi-k2\.?5|k2\.?5");
cached_regex!(kimi_k25_re, r"kimi-k2\.5|k2\.5");
cached_regex!(qwen3_re, r"qwen3");
cached_regex!(minimax_m21_re, r"minimax[-_ ]?m2\.1");
cached_regex!(gemini_25_pro_re, r"gemini-2\.5-pro");
cached_regex!(qwen_re, r"(?i)qwen");

fn matches(re: &Regex, text: &str) -> bool {
    re.is_match(text)
}

/// 深度推理类名称（opus / pro / thinking ...）
pub fn has_deep_token(text: &str) -> bool {
    matches(deep_re(), text)
}

/// 快速 / 小模型类名称（nano / flash / mini ...）
pub fn has_fast_token(text: &str) -> bool {
    matches(fast_re(), text)
}

/// 代码类名称（codex / coder ...）
pub fn has_code_token(text: &str) -> bool {
    matches(code_re(), text)
}

/// 是否为 flash 变体
pub fn has_flash_token(model: &DiscoveredModel) -> bool {
    matches(flash_re(), &format!("{} {}", model.model, model.name))
}

/// zai-coding-plan 上的 glm-4.7 家族
pub fn is_zai_glm47(model: &DiscoveredModel) -> bool {
    model.provider_id == provider::ZAI_CODING_PLAN
        && matches(glm47_re(), &format!("{} {}", model.model, model.name))
}

/// kimi k2.5 家族（宽松匹配，允许省略小数点）
pub fn is_kimi_k25(model: &DiscoveredModel) -> bool {
    matches(kimi_k25_loose_re(), &format!("{} {}", model.model, model.name))
}

/// 文本中明确出现 kimi k2.5（需已小写）
pub fn mentions_kimi_k25(lowered: &str) -> bool {
    matches(kimi_k25_re(), lowered)
}

/// 文本中出现 qwen3（需已小写）
pub fn mentions_qwen3(lowered: &str) -> bool {
    matches(qwen3_re(), lowered)
}

/// 文本中出现 minimax m2.1（需已小写）
pub fn mentions_minimax_m21(lowered: &str) -> bool {
    matches(minimax_m21_re(), lowered)
}

/// 高端视觉模型 gemini-2.5-pro（需已小写）
pub fn mentions_gemini_25_pro(lowered: &str) -> bool {
    matches(gemini_25_pro_re(), lowered)
}

/// 聚合 Provider 上被整体排除的 qwen 系列
pub fn is_excluded_aggregator_model(model: &DiscoveredModel) -> bool {
    provider::is_aggregator(&model.provider_id) && matches(qwen_re(), &model.model)
}
