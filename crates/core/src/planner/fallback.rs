//! 降级链构建
//!
//! 为每个角色生成有序、去重的降级链：首选模型、各 Provider 的代表模型、
//! 固定的聚合 / 免费模型，最后以免费档模型收尾。

use super::provider::{self, UNIVERSAL_DEFAULT_MODEL};
use super::role::AgentRole;
use super::strategy::ScoredCandidate;
use super::tokens::has_flash_token;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// 降级链最大长度
pub const MAX_CHAIN_LEN: usize = 10;

/// 去重并保持首次出现的顺序，空项被跳过
pub fn dedupe_models<I, S>(models: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = IndexSet::new();
    for model in models {
        let model = model.as_ref();
        if !model.is_empty() {
            seen.insert(model.to_string());
        }
    }
    seen.into_iter().collect()
}

/// 角色在聚合 / 免费 Provider 上的固定模型
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePins {
    /// 聚合 Provider 上的固定模型
    pub aggregator: Option<String>,
    /// 免费档 Provider 上的固定模型
    pub free: Option<String>,
}

impl RolePins {
    /// 指定 Provider 的固定模型
    pub fn for_provider(&self, provider_id: &str) -> Option<&str> {
        if provider::is_aggregator(provider_id) {
            self.aggregator.as_deref()
        } else if provider::is_free_tier(provider_id) {
            self.free.as_deref()
        } else {
            None
        }
    }

    /// Provider 兜底策略层的模型列表
    pub fn provider_policy(&self) -> Vec<String> {
        dedupe_models(self.aggregator.iter().chain(self.free.iter()))
    }

    /// 系统默认模型：免费档固定模型，否则通用默认模型
    pub fn system_default(&self) -> String {
        self.free
            .clone()
            .unwrap_or_else(|| UNIVERSAL_DEFAULT_MODEL.to_string())
    }

    /// 已选模型所在 Provider 若有固定模型，返回该固定模型
    pub fn forced_for(&self, model: &str) -> Option<&str> {
        if provider::is_aggregator(super::model::provider_of(model)) {
            self.aggregator.as_deref()
        } else if provider::is_free_tier_model(model) {
            self.free.as_deref()
        } else {
            None
        }
    }
}

/// 选出 Provider 的代表模型
///
/// 默认取最佳非 flash 模型，最佳 flash 模型领先足够多时改用 flash。
pub fn choose_provider_representative<'a>(
    provider_models: &[&'a ScoredCandidate],
    role: AgentRole,
) -> Option<&'a ScoredCandidate> {
    let first = provider_models.first().copied()?;
    let flash_best = provider_models
        .iter()
        .copied()
        .find(|c| has_flash_token(&c.model));
    let non_flash_best = provider_models
        .iter()
        .copied()
        .find(|c| !has_flash_token(&c.model));

    match (flash_best, non_flash_best) {
        (_, None) => Some(first),
        (None, Some(non_flash)) => Some(non_flash),
        (Some(flash), Some(non_flash)) => {
            if flash.total_score >= non_flash.total_score + role.flash_representative_threshold() {
                Some(flash)
            } else {
                Some(non_flash)
            }
        }
    }
}

/// Provider 的打包条目：代表模型，分差足够小时再加一个
///
/// 聚合 Provider 总是带上第二个模型。
pub fn provider_bundle(provider_models: &[&ScoredCandidate], role: AgentRole) -> Vec<String> {
    let Some(representative) = choose_provider_representative(provider_models, role) else {
        return Vec::new();
    };

    let second = provider_models
        .iter()
        .copied()
        .find(|c| c.model_id() != representative.model_id());
    let Some(second) = second else {
        return vec![representative.model_id().to_string()];
    };

    let gap = (representative.total_score - second.total_score).abs();
    if provider::is_aggregator(representative.provider_id()) || gap <= role.bundle_tolerance() {
        vec![
            representative.model_id().to_string(),
            second.model_id().to_string(),
        ]
    } else {
        vec![representative.model_id().to_string()]
    }
}

/// 以指定模型收尾
///
/// 有收尾模型时取前 9 个非收尾条目再接收尾；否则追加通用默认模型并截断到 10 个。
pub fn finalize_chain_with_tail(prefix: &[String], tail: Option<&str>) -> Vec<String> {
    match tail {
        Some(tail) => {
            let mut chain: Vec<String> = prefix
                .iter()
                .filter(|model| model.as_str() != tail)
                .take(MAX_CHAIN_LEN - 1)
                .cloned()
                .collect();
            chain.push(tail.to_string());
            chain
        }
        None => {
            let mut chain = dedupe_models(prefix.iter().map(String::as_str).chain([UNIVERSAL_DEFAULT_MODEL]));
            chain.truncate(MAX_CHAIN_LEN);
            chain
        }
    }
}

/// 构建角色的动态推荐降级链
///
/// `ranked` 为该角色的完整排序；存在合格候选时只使用合格候选。
pub fn build_fallback_chain(
    primary: &str,
    ranked: &[ScoredCandidate],
    role: AgentRole,
    pins: &RolePins,
) -> Vec<String> {
    let any_eligible = ranked.iter().any(|c| c.is_eligible());
    let usable: Vec<&ScoredCandidate> = ranked
        .iter()
        .filter(|c| !any_eligible || c.is_eligible())
        .collect();

    let mut by_provider: IndexMap<&str, Vec<&ScoredCandidate>> = IndexMap::new();
    for candidate in &usable {
        by_provider
            .entry(candidate.provider_id())
            .or_default()
            .push(candidate);
    }

    let mut paid_entries = Vec::new();
    let mut free_entries = Vec::new();
    for (provider_id, provider_models) in &by_provider {
        let pinned = pins
            .for_provider(provider_id)
            .filter(|pin| provider_models.iter().any(|c| c.model_id() == *pin));
        let entries = match pinned {
            Some(pin) => vec![pin.to_string()],
            None => provider_bundle(provider_models, role),
        };
        for entry in entries {
            if provider::is_free_tier_model(&entry) {
                free_entries.push(entry);
            } else {
                paid_entries.push(entry);
            }
        }
    }

    let chain = dedupe_models(
        std::iter::once(primary)
            .chain(paid_entries.iter().map(String::as_str))
            .chain(pins.aggregator.as_deref())
            .chain(pins.free.as_deref())
            .chain(free_entries.iter().map(String::as_str)),
    );

    let tail = pins
        .free
        .as_deref()
        .or(free_entries.first().map(String::as_str))
        .or_else(|| {
            usable
                .iter()
                .find(|c| provider::is_free_tier_model(c.model_id()))
                .map(|c| c.model_id())
        });

    finalize_chain_with_tail(&chain, tail)
}
