//! 分配后调整
//!
//! 零使用 Provider 补救与订阅均衡两个后置步骤，均通过单角色换模型实现。

use super::fallback::{dedupe_models, RolePins, MAX_CHAIN_LEN};
use super::model::provider_of;
use super::precedence::{Provenance, ResolutionLayer};
use super::role::AgentRole;
use super::selector::{ProviderTargets, ProviderUsage};
use super::strategy::ScoredCandidate;
use tracing::{debug, info};

/// 均衡换模型允许的最大分数损失
pub const MAX_BALANCE_SCORE_LOSS: f64 = 20.0;

/// 单个角色的分配状态
#[derive(Debug, Clone)]
pub struct RoleSlot {
    pub role: AgentRole,
    pub model: String,
    pub chain: Vec<String>,
    pub provenance: Provenance,
    /// 该角色在实际引擎下的完整排序
    pub ranked: Vec<ScoredCandidate>,
    pub pins: RolePins,
    pub system_default: String,
    /// 由用户层决定，不参与调整
    pub locked: bool,
}

impl RoleSlot {
    fn provider(&self) -> &str {
        provider_of(&self.model)
    }

    fn score_of(&self, model: &str) -> Option<f64> {
        self.ranked
            .iter()
            .find(|c| c.model_id() == model)
            .map(|c| c.total_score)
    }

    /// 当前模型的分数，模型不在排序中时取同 Provider 的最佳候选
    fn current_score(&self) -> Option<f64> {
        self.score_of(&self.model).or_else(|| {
            self.ranked
                .iter()
                .find(|c| c.provider_id() == self.provider())
                .map(|c| c.total_score)
        })
    }

    /// 指定 Provider 上的换入候选：固定模型优先，否则取最佳合格候选
    fn candidate_for(&self, provider_id: &str) -> Option<&ScoredCandidate> {
        let pinned = self.pins.for_provider(provider_id);
        pinned
            .and_then(|pin| self.ranked.iter().find(|c| c.model_id() == pin))
            .or_else(|| {
                self.ranked
                    .iter()
                    .find(|c| c.provider_id() == provider_id && c.is_eligible())
            })
    }

    /// 把模型放到降级链首位并记录来源，保留系统默认收尾和长度上限
    pub fn prepend_model(&mut self, model: &str, layer: ResolutionLayer) {
        let body = dedupe_models(
            std::iter::once(model)
                .chain(self.chain.iter().map(String::as_str))
                .filter(|m| *m != self.system_default),
        );
        let mut chain: Vec<String> = body.into_iter().take(MAX_CHAIN_LEN - 1).collect();
        chain.push(self.system_default.clone());

        self.model = model.to_string();
        self.chain = chain;
        self.provenance = Provenance {
            winner_layer: layer,
            winner_model: model.to_string(),
        };
    }

    /// 调整步骤中换用新模型
    pub fn swap_to(&mut self, model: &str) {
        self.prepend_model(model, ResolutionLayer::ProviderFallbackPolicy);
    }
}

struct Swap {
    index: usize,
    model: String,
    loss: f64,
}

fn usage_of(slots: &[RoleSlot]) -> ProviderUsage {
    ProviderUsage::from_models(slots.iter().map(|slot| slot.model.as_str()))
}

/// 零使用 Provider 补救
///
/// 按 Provider 排序依次处理，每个零使用的付费 Provider 从任意未锁定角色中
/// 以最小损失换入一个角色，不限制损失。被换出的 Provider 仍保有角色的换法优先，
/// 本轮已补救的角色不再被换出。
pub fn rescue_unused_providers(slots: &mut [RoleSlot], paid_providers: &[String]) {
    let mut providers: Vec<&String> = paid_providers.iter().collect();
    providers.sort();
    let mut rescued: Vec<usize> = Vec::new();

    for provider_id in providers {
        let usage = usage_of(slots);
        if usage.get(provider_id) > 0 {
            continue;
        }

        // (是否清空换出方, 损失) 字典序最小者胜出
        let mut best: Option<(bool, Swap)> = None;
        for (index, slot) in slots.iter().enumerate() {
            if slot.locked || rescued.contains(&index) {
                continue;
            }
            let (Some(candidate), Some(current)) = (slot.candidate_for(provider_id), slot.current_score()) else {
                continue;
            };
            let empties_donor = usage.get(slot.provider()) <= 1;
            let loss = current - candidate.total_score;
            let better = best.as_ref().map_or(true, |(empties, b)| {
                (empties_donor, loss).partial_cmp(&(*empties, b.loss)) == Some(std::cmp::Ordering::Less)
            });
            if better {
                best = Some((
                    empties_donor,
                    Swap {
                        index,
                        model: candidate.model_id().to_string(),
                        loss,
                    },
                ));
            }
        }

        if let Some((_, swap)) = best {
            let slot = &mut slots[swap.index];
            info!(
                "[{}] 补救未使用的 Provider {}: {} -> {} (损失 {:.3})",
                slot.role, provider_id, slot.model, swap.model, swap.loss
            );
            slot.swap_to(&swap.model);
            rescued.push(swap.index);
        } else {
            debug!("Provider {} 无可补救的角色", provider_id);
        }
    }
}

/// 订阅均衡
///
/// 反复把超出目标的 Provider 上的角色换到低于目标的 Provider，
/// 每次取损失最小且不超过上限的换法，直到没有失衡或没有可行换法。
pub fn rebalance_for_subscription(slots: &mut [RoleSlot], paid_providers: &[String], targets: &ProviderTargets) {
    if paid_providers.len() <= 1 {
        return;
    }

    // 每次换模型都会让一个角色落到低于目标的 Provider 上，轮数有限
    let max_rounds = slots.len() * paid_providers.len();
    for _ in 0..max_rounds {
        let usage = usage_of(slots);
        let target_of = |provider: &str| targets.get(provider).unwrap_or(0);
        let under: Vec<&str> = paid_providers
            .iter()
            .map(String::as_str)
            .filter(|p| usage.get(p) < target_of(p))
            .collect();
        let over: Vec<&str> = paid_providers
            .iter()
            .map(String::as_str)
            .filter(|p| usage.get(p) > target_of(p))
            .collect();
        if under.is_empty() || over.is_empty() {
            break;
        }

        let mut best: Option<Swap> = None;
        for (index, slot) in slots.iter().enumerate() {
            if slot.locked || !over.contains(&slot.provider()) {
                continue;
            }
            let Some(current) = slot.current_score() else {
                continue;
            };
            for provider_id in &under {
                let Some(candidate) = slot.candidate_for(provider_id) else {
                    continue;
                };
                let loss = current - candidate.total_score;
                if loss > MAX_BALANCE_SCORE_LOSS {
                    continue;
                }
                if best.as_ref().map_or(true, |b| loss < b.loss) {
                    best = Some(Swap {
                        index,
                        model: candidate.model_id().to_string(),
                        loss,
                    });
                }
            }
        }

        let Some(swap) = best else {
            break;
        };
        let slot = &mut slots[swap.index];
        info!(
            "[{}] 订阅均衡: {} -> {} (损失 {:.3})",
            slot.role, slot.model, swap.model, swap.loss
        );
        slot.swap_to(&swap.model);
    }
}
