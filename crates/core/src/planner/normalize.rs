//! 模型 ID 规范化
//!
//! 把模型 ID 展开为一组有序的查找别名，用于匹配外部信号。
//! 别名的插入顺序就是信号查找顺序（首个命中生效），调整生成顺序会改变评分结果。

use crate::cached_regex;
use indexmap::IndexSet;

cached_regex!(quantization_re, r"\bfp[a-z0-9.-]*\b");
cached_regex!(deployment_re, r"\btee\b");
cached_regex!(dash_run_re, r"-+");
cached_regex!(space_run_re, r"\s+");
cached_regex!(slash_run_re, r"/+");
cached_regex!(slash_dash_re, r"/-+");
cached_regex!(dash_slash_re, r"-+/");
cached_regex!(flat_separator_re, r"[/\s]+");
cached_regex!(variant_suffix_re, r"-(free|flash)$");

/// 清理单个别名
///
/// `preserve_slash` 为 true 时保留路径分隔符，否则全部压平为 `-`。
fn cleanup_alias(input: &str, preserve_slash: bool) -> String {
    // 下划线视为分隔符，量化 / 部署标记才能作为完整单词被移除
    let value = input.trim().to_lowercase().replace('_', " ");
    let value = quantization_re().replace_all(&value, " ");
    let value = deployment_re().replace_all(&value, " ");

    if preserve_slash {
        let value = space_run_re().replace_all(&value, "-");
        let value = dash_run_re().replace_all(&value, "-");
        let value = slash_dash_re().replace_all(&value, "/");
        let value = dash_slash_re().replace_all(&value, "/");
        let value = slash_run_re().replace_all(&value, "/");
        return value.trim_matches(|c| c == '/' || c == '-').to_string();
    }

    let value = flat_separator_re().replace_all(&value, "-");
    let value = dash_run_re().replace_all(&value, "-");
    value.trim_matches('-').to_string()
}

/// 依次去掉末尾的 `-free` / `-flash`，每一步的结果都作为别名
fn add_suffix_stripped(alias: &str, aliases: &mut IndexSet<String>) {
    let mut current = alias.to_string();
    loop {
        let stripped = variant_suffix_re().replace(&current, "").to_string();
        if stripped == current || stripped.is_empty() {
            break;
        }
        aliases.insert(stripped.clone());
        current = stripped;
    }
}

fn add_derived_aliases(seed: &str, aliases: &mut IndexSet<String>) {
    let slash_alias = cleanup_alias(seed, true);
    let flat_alias = cleanup_alias(seed, false);

    if !slash_alias.is_empty() {
        aliases.insert(slash_alias.clone());
    }
    if !flat_alias.is_empty() {
        aliases.insert(flat_alias.clone());
    }

    if !slash_alias.is_empty() {
        add_suffix_stripped(&slash_alias, aliases);
    }
    if !flat_alias.is_empty() {
        add_suffix_stripped(&flat_alias, aliases);
    }

    if slash_alias.contains('/') {
        for separator in [" ", "-"] {
            let variant = cleanup_alias(&slash_alias.replace('/', separator), false);
            if !variant.is_empty() {
                aliases.insert(variant);
            }
        }
        if let Some(last_part) = slash_alias.rsplit('/').next() {
            if !last_part.is_empty() {
                add_derived_aliases(last_part, aliases);
            }
        }
    }
}

/// 生成模型 ID 的全部查找别名
///
/// 依次对完整 ID、去掉首段 Provider 后的部分以及更深的路径后缀展开。
/// 空白输入返回空列表。
pub fn build_model_key_aliases(input: &str) -> Vec<String> {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut aliases = IndexSet::new();
    add_derived_aliases(&normalized, &mut aliases);

    let mut rest = normalized.as_str();
    while let Some((_, tail)) = rest.split_once('/') {
        if !tail.is_empty() {
            add_derived_aliases(tail, &mut aliases);
        }
        rest = tail;
    }

    aliases.into_iter().filter(|alias| !alias.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalizes_multi_segment_aggregator_ids() {
        let aliases = build_model_key_aliases("chutes/Qwen/Qwen3-Coder-480B-A35B-Instruct-FP8-TEE");

        assert!(aliases.contains(&"qwen/qwen3-coder-480b-a35b-instruct".to_string()));
        assert!(aliases.contains(&"qwen3-coder-480b-a35b-instruct".to_string()));
        assert!(!aliases.contains(&"qwen3-coder-480b-a35b-instruct-fp8-tee".to_string()));
    }

    #[test]
    fn test_spaces_and_hyphens_are_equivalent() {
        let aliases = build_model_key_aliases("Qwen3 Coder 480B A35B Instruct");
        assert!(aliases.contains(&"qwen3-coder-480b-a35b-instruct".to_string()));
    }

    #[test]
    fn test_full_id_alias_comes_first() {
        let aliases = build_model_key_aliases("openai/gpt-5.3-codex");
        assert_eq!(aliases[0], "openai/gpt-5.3-codex");
        assert_eq!(aliases[1], "openai-gpt-5.3-codex");
        assert!(aliases.contains(&"gpt-5.3-codex".to_string()));
    }

    #[test]
    fn test_strips_variant_suffixes() {
        let aliases = build_model_key_aliases("opencode/glm-4.7-free");
        assert!(aliases.contains(&"glm-4.7-free".to_string()));
        assert!(aliases.contains(&"glm-4.7".to_string()));

        let stacked = build_model_key_aliases("google/gemini-3-flash-free");
        assert!(stacked.contains(&"gemini-3-flash".to_string()));
        assert!(stacked.contains(&"gemini-3".to_string()));
    }

    #[test]
    fn test_underscore_is_a_separator() {
        let aliases = build_model_key_aliases("vendor/model_name_fp16");
        assert!(aliases.contains(&"model-name".to_string()));
    }

    #[test]
    fn test_blank_input() {
        assert!(build_model_key_aliases("   ").is_empty());
        assert!(!build_model_key_aliases("x").is_empty());
    }

    fn arb_model_id() -> impl Strategy<Value = String> {
        (
            "[a-z][a-z0-9-]{0,10}[a-z0-9]",
            prop::collection::vec("[A-Za-z0-9]{1,6}(-[A-Za-z0-9.]{1,5}){0,3}", 1..4),
            prop::sample::select(vec!["", "-FP8", "-FP8-TEE", "-free", "-flash", "-flash-free", " Preview"]),
        )
            .prop_map(|(provider, segments, suffix)| {
                format!("{}/{}{}", provider, segments.join("/"), suffix)
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// 对任意别名再次规范化，结果都包含在原别名集合中
        #[test]
        fn prop_aliases_are_idempotent(id in arb_model_id()) {
            let aliases = build_model_key_aliases(&id);
            prop_assert!(!aliases.is_empty());
            for alias in &aliases {
                for again in build_model_key_aliases(alias) {
                    prop_assert!(
                        aliases.contains(&again),
                        "别名 {} 再规范化得到 {}，不在原集合中: {:?}",
                        alias,
                        again,
                        aliases
                    );
                }
            }
        }

        /// 量化后缀被剥离，裸家族名可用于匹配外部信号
        #[test]
        fn prop_quantization_suffix_round_trip(
            org in "[a-z][a-z0-9]{1,8}",
            name in "[a-z][a-z0-9]{1,8}-[a-z0-9]{1,6}",
        ) {
            let id = format!("chutes/{}/{}-FP8-TEE", org, name);
            let aliases = build_model_key_aliases(&id);
            let scoped = format!("{}/{}", org, name);
            prop_assert!(aliases.contains(&scoped));
            prop_assert!(aliases.contains(&name));
        }
    }
}
