//! 主分配选择器
//!
//! 按固定角色顺序贪心选出每个角色的首选模型，在质量窗口内偏向使用不足的 Provider。

use super::model::provider_of;
use super::role::AgentRole;
use super::strategy::{round_score, ScoredCandidate};
use super::tokens::{has_flash_token, is_kimi_k25, is_zai_glm47};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// 低于目标时每个缺口的加分
const DEFICIT_BONUS: f64 = 14.0;
/// 超过软上限的惩罚
const SOFT_OVERFLOW_PENALTY: f64 = 18.0;
/// 超过硬上限的惩罚
const HARD_OVERFLOW_PENALTY: f64 = 100.0;
/// 硬上限的最大值
const HARD_CAP_CEILING: u32 = 4;
/// 换用未使用 Provider 时允许的调整分差
const UNUSED_PROVIDER_TOLERANCE: f64 = 9.0;
/// glm-4.7 flash 换成 kimi-k2.5 时允许的原始分差
const KIMI_SWAP_TOLERANCE: f64 = 2.0;

/// Provider 使用计数
///
/// 在角色循环中显式传递，只影响多样性调整。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUsage {
    counts: BTreeMap<String, u32>,
}

impl ProviderUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按完整模型 ID 统计
    pub fn from_models<'a>(models: impl IntoIterator<Item = &'a str>) -> Self {
        let mut usage = Self::new();
        for model in models {
            usage.increment(provider_of(model));
        }
        usage
    }

    pub fn get(&self, provider_id: &str) -> u32 {
        self.counts.get(provider_id).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, provider_id: &str) {
        if provider_id.is_empty() {
            return;
        }
        *self.counts.entry(provider_id.to_string()).or_insert(0) += 1;
    }

    pub fn decrement(&mut self, provider_id: &str) {
        if let Some(count) = self.counts.get_mut(provider_id) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// 每个付费 Provider 的目标角色数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTargets {
    targets: BTreeMap<String, u32>,
}

impl ProviderTargets {
    /// 把六个角色平均分给付费 Provider，余数给字母序靠前的 Provider
    pub fn compute(paid_providers: &[String]) -> Self {
        let mut sorted: Vec<&String> = paid_providers.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut targets = BTreeMap::new();
        if sorted.is_empty() {
            return Self { targets };
        }

        let slots = AgentRole::ALL.len() as u32;
        let count = sorted.len() as u32;
        let base = slots / count;
        let extra = slots % count;
        for (index, provider_id) in sorted.into_iter().enumerate() {
            let bonus = if (index as u32) < extra { 1 } else { 0 };
            targets.insert(provider_id.clone(), base + bonus);
        }
        Self { targets }
    }

    /// 显式目标
    pub fn get(&self, provider_id: &str) -> Option<u32> {
        self.targets.get(provider_id).copied()
    }

    /// 选择时使用的目标，没有目标的 Provider 视为 1
    pub fn effective(&self, provider_id: &str) -> u32 {
        self.get(provider_id).unwrap_or(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.targets.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// 单个候选的选择评估
#[derive(Debug, Clone)]
struct Evaluated<'a> {
    candidate: &'a ScoredCandidate,
    usage: u32,
    target: u32,
    raw: f64,
    adjusted: f64,
}

impl Evaluated<'_> {
    fn provider(&self) -> &str {
        self.candidate.provider_id()
    }

    fn load_ratio(&self) -> f64 {
        if self.target > 0 {
            self.usage as f64 / self.target as f64
        } else {
            self.usage as f64
        }
    }
}

/// 多样性调整后的分数
pub fn diversity_adjusted_score(raw: f64, usage: u32, target: u32) -> f64 {
    let usage = usage as f64;
    let target = target as f64;
    let hard_cap = (target + 1.0).min(HARD_CAP_CEILING as f64);
    let deficit = (target - usage).max(0.0);
    let soft_overflow = (usage + 1.0 - target).max(0.0);
    let hard_overflow = (usage + 1.0 - hard_cap).max(0.0);

    round_score(
        raw + deficit * DEFICIT_BONUS
            - soft_overflow * SOFT_OVERFLOW_PENALTY
            - hard_overflow * HARD_OVERFLOW_PENALTY,
    )
}

fn compare_evaluated(a: &Evaluated<'_>, b: &Evaluated<'_>) -> Ordering {
    b.adjusted
        .total_cmp(&a.adjusted)
        .then_with(|| a.load_ratio().total_cmp(&b.load_ratio()))
        .then_with(|| b.raw.total_cmp(&a.raw))
        .then_with(|| a.provider().cmp(b.provider()))
        .then_with(|| a.candidate.model_id().cmp(b.candidate.model_id()))
}

/// 为角色选出首选模型
///
/// `ranked` 需已按评分引擎排序。存在合格候选时只在合格候选中选择。
pub fn select_primary_with_diversity<'a>(
    ranked: &'a [ScoredCandidate],
    role: AgentRole,
    usage: &ProviderUsage,
    targets: &ProviderTargets,
    remaining_slots: usize,
) -> Option<&'a ScoredCandidate> {
    let any_eligible = ranked.iter().any(|c| c.is_eligible());
    let pool: Vec<Evaluated<'a>> = ranked
        .iter()
        .filter(|c| !any_eligible || c.is_eligible())
        .map(|candidate| {
            let provider = candidate.provider_id();
            let used = usage.get(provider);
            let target = targets.effective(provider);
            Evaluated {
                candidate,
                usage: used,
                target,
                raw: candidate.total_score,
                adjusted: diversity_adjusted_score(candidate.total_score, used, target),
            }
        })
        .collect();

    let first = pool.first()?;

    let best_raw = pool
        .iter()
        .map(|e| e.raw)
        .fold(f64::NEG_INFINITY, f64::max);
    let window = role.quality_window();
    let mut shortlist: Vec<&Evaluated<'a>> =
        pool.iter().filter(|e| e.raw >= best_raw - window).collect();

    let must_fill: Vec<&str> = targets
        .iter()
        .filter(|(provider, target)| target.saturating_sub(usage.get(provider)) as usize >= remaining_slots)
        .map(|(provider, _)| provider)
        .collect();
    if !must_fill.is_empty() {
        let forced: Vec<&Evaluated<'a>> = shortlist
            .iter()
            .copied()
            .filter(|e| must_fill.contains(&e.provider()))
            .collect();
        if !forced.is_empty() {
            debug!("[{}] 必须补位的 Provider: {:?}", role, must_fill);
            shortlist = forced;
        }
    }

    shortlist.sort_by(|a, b| compare_evaluated(a, b));
    let mut chosen = shortlist.first().copied().unwrap_or(first);

    if chosen.usage >= 2 {
        if let Some(unused) = pool.iter().find(|e| e.usage == 0) {
            if unused.adjusted >= chosen.adjusted - UNUSED_PROVIDER_TOLERANCE {
                debug!(
                    "[{}] {} 已占用 {} 个角色，改用未使用的 {}",
                    role,
                    chosen.provider(),
                    chosen.usage,
                    unused.candidate.model_id()
                );
                chosen = unused;
            }
        }
    }

    if role != AgentRole::Explorer
        && is_zai_glm47(&chosen.candidate.model)
        && has_flash_token(&chosen.candidate.model)
    {
        if let Some(kimi) = pool.iter().find(|e| is_kimi_k25(&e.candidate.model)) {
            if kimi.raw >= chosen.raw - KIMI_SWAP_TOLERANCE {
                debug!("[{}] glm-4.7 flash 改用 {}", role, kimi.candidate.model_id());
                chosen = kimi;
            }
        }
    }

    Some(chosen.candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::model::DiscoveredModel;
    use crate::planner::strategy::{Eligibility, ScoreBreakdown};

    fn candidate(full_id: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            model: DiscoveredModel::from_full_id(full_id).unwrap(),
            total_score: score,
            eligibility: Eligibility::Eligible,
            breakdown: ScoreBreakdown::Heuristic {
                base_score: score,
                external_signal_boost: 0.0,
            },
        }
    }

    fn providers(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_targets_split_evenly_with_alphabetical_remainder() {
        let targets = ProviderTargets::compute(&providers(&["zai-coding-plan", "openai", "chutes", "anthropic"]));
        assert_eq!(targets.get("anthropic"), Some(2));
        assert_eq!(targets.get("chutes"), Some(2));
        assert_eq!(targets.get("openai"), Some(1));
        assert_eq!(targets.get("zai-coding-plan"), Some(1));
        assert_eq!(targets.effective("opencode"), 1);

        let single = ProviderTargets::compute(&providers(&["openai"]));
        assert_eq!(single.get("openai"), Some(6));
        assert!(ProviderTargets::compute(&[]).is_empty());
    }

    #[test]
    fn test_diversity_adjusted_score() {
        // 目标 2，未使用：+28，溢出 0
        assert_eq!(diversity_adjusted_score(100.0, 0, 2), 128.0);
        // 目标 1，已用 1：软溢出 1，硬溢出 0
        assert_eq!(diversity_adjusted_score(100.0, 1, 1), 82.0);
        // 目标 1，已用 2：软溢出 2，硬溢出 1
        assert_eq!(diversity_adjusted_score(100.0, 2, 1), -36.0);
    }

    #[test]
    fn test_usage_counter() {
        let mut usage = ProviderUsage::from_models(["openai/gpt-5", "openai/gpt-4.1", "chutes/a/b"]);
        assert_eq!(usage.get("openai"), 2);
        assert_eq!(usage.get("chutes"), 1);
        usage.decrement("chutes");
        usage.decrement("chutes");
        assert_eq!(usage.get("chutes"), 0);
        assert_eq!(usage.get("missing"), 0);
    }

    #[test]
    fn test_prefers_underused_provider_within_window() {
        let ranked = vec![candidate("openai/gpt-5.3-codex", 150.0), candidate("anthropic/claude-opus-4-6", 145.0)];
        let targets = ProviderTargets::compute(&providers(&["anthropic", "openai"]));
        let mut usage = ProviderUsage::new();
        usage.increment("openai");
        usage.increment("openai");

        let chosen = select_primary_with_diversity(&ranked, AgentRole::Fixer, &usage, &targets, 4).unwrap();
        assert_eq!(chosen.model_id(), "anthropic/claude-opus-4-6");

        let fresh = ProviderUsage::new();
        let chosen = select_primary_with_diversity(&ranked, AgentRole::Fixer, &fresh, &targets, 6).unwrap();
        assert_eq!(chosen.model_id(), "openai/gpt-5.3-codex");
    }

    #[test]
    fn test_quality_window_excludes_weak_candidates() {
        let ranked = vec![candidate("openai/gpt-5.3-codex", 150.0), candidate("anthropic/claude-haiku", 60.0)];
        let targets = ProviderTargets::compute(&providers(&["anthropic", "openai"]));
        let mut usage = ProviderUsage::new();
        usage.increment("openai");
        usage.increment("openai");
        usage.increment("openai");

        // 分差超出窗口，换用未使用的 Provider 也超出 9 分容差
        let chosen = select_primary_with_diversity(&ranked, AgentRole::Oracle, &usage, &targets, 3).unwrap();
        assert_eq!(chosen.model_id(), "openai/gpt-5.3-codex");
    }

    #[test]
    fn test_mandatory_fill() {
        let ranked = vec![candidate("anthropic/claude-opus-4-6", 150.0), candidate("openai/gpt-5.3-codex", 135.0)];
        let targets = ProviderTargets::compute(&providers(&["anthropic", "openai"]));
        let mut usage = ProviderUsage::new();
        usage.increment("anthropic");

        // 调整分 anthropic 178 > openai 177，但 openai 缺 3 个且只剩 3 个位置
        let chosen = select_primary_with_diversity(&ranked, AgentRole::Fixer, &usage, &targets, 3).unwrap();
        assert_eq!(chosen.model_id(), "openai/gpt-5.3-codex");

        let chosen = select_primary_with_diversity(&ranked, AgentRole::Fixer, &usage, &targets, 4).unwrap();
        assert_eq!(chosen.model_id(), "anthropic/claude-opus-4-6");
    }

    #[test]
    fn test_zai_flash_swaps_to_kimi() {
        let ranked = vec![
            candidate("zai-coding-plan/glm-4.7-flash", 120.0),
            candidate("kimi-for-coding/kimi-k2.5", 118.5),
        ];
        let targets = ProviderTargets::compute(&providers(&["kimi-for-coding", "zai-coding-plan"]));
        let usage = ProviderUsage::new();

        let chosen = select_primary_with_diversity(&ranked, AgentRole::Designer, &usage, &targets, 6).unwrap();
        assert_eq!(chosen.model_id(), "kimi-for-coding/kimi-k2.5");

        let chosen = select_primary_with_diversity(&ranked, AgentRole::Explorer, &usage, &targets, 6).unwrap();
        assert_eq!(chosen.model_id(), "zai-coding-plan/glm-4.7-flash");
    }

    #[test]
    fn test_ineligible_candidates_skipped() {
        let mut floored = candidate("openai/no-tools", 999.0);
        floored.eligibility = Eligibility::MissingToolcall;
        let ranked = vec![floored, candidate("anthropic/claude-sonnet-4-5", 10.0)];
        let targets = ProviderTargets::compute(&providers(&["anthropic", "openai"]));

        let chosen =
            select_primary_with_diversity(&ranked, AgentRole::Fixer, &ProviderUsage::new(), &targets, 6).unwrap();
        assert_eq!(chosen.model_id(), "anthropic/claude-sonnet-4-5");
        assert!(select_primary_with_diversity(&[], AgentRole::Fixer, &ProviderUsage::new(), &targets, 6).is_none());
    }
}
