//! 外部质量信号
//!
//! 第三方榜单提供的质量、代码能力、延迟与价格数据，以别名为键。
//! 模型通过 [`build_model_key_aliases`] 生成的别名按顺序查找，首个命中生效。

use super::model::DiscoveredModel;
use super::normalize::build_model_key_aliases;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 信号来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalSource {
    #[serde(rename = "artificial-analysis")]
    ArtificialAnalysis,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "merged")]
    Merged,
}

/// 单个模型的外部信号，所有数值字段可缺省
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coding_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_seconds: Option<f64>,
    #[serde(
        rename = "inputPricePer1M",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub input_price_per_1m: Option<f64>,
    #[serde(
        rename = "outputPricePer1M",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_price_per_1m: Option<f64>,
    pub source: SignalSource,
}

/// 别名 → 信号
pub type ExternalSignalMap = HashMap<String, ExternalSignal>;

impl ExternalSignal {
    /// 创建空信号
    pub fn new(source: SignalSource) -> Self {
        Self {
            quality_score: None,
            coding_score: None,
            latency_seconds: None,
            input_price_per_1m: None,
            output_price_per_1m: None,
            source,
        }
    }

    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality_score = Some(quality);
        self
    }

    pub fn with_coding(mut self, coding: f64) -> Self {
        self.coding_score = Some(coding);
        self
    }

    pub fn with_latency(mut self, seconds: f64) -> Self {
        self.latency_seconds = Some(seconds);
        self
    }

    pub fn with_prices(mut self, input: Option<f64>, output: Option<f64>) -> Self {
        self.input_price_per_1m = input;
        self.output_price_per_1m = output;
        self
    }

    /// 综合价格：输入与输出都有时按 3:1 混合，否则取存在的一项，都没有为 0
    pub fn blended_price(&self) -> f64 {
        match (self.input_price_per_1m, self.output_price_per_1m) {
            (Some(input), Some(output)) => input * 0.75 + output * 0.25,
            (Some(input), None) => input,
            (None, Some(output)) => output,
            (None, None) => 0.0,
        }
    }

    /// 有限的延迟值，缺失或非有限值视为无数据
    pub fn finite_latency(&self) -> Option<f64> {
        self.latency_seconds.filter(|value| value.is_finite())
    }
}

/// 合并两条信号，新信号中非空的字段覆盖旧值
pub fn merge_signal(existing: Option<&ExternalSignal>, incoming: ExternalSignal) -> ExternalSignal {
    let Some(existing) = existing else {
        return incoming;
    };

    ExternalSignal {
        quality_score: incoming.quality_score.or(existing.quality_score),
        coding_score: incoming.coding_score.or(existing.coding_score),
        latency_seconds: incoming.latency_seconds.or(existing.latency_seconds),
        input_price_per_1m: incoming.input_price_per_1m.or(existing.input_price_per_1m),
        output_price_per_1m: incoming
            .output_price_per_1m
            .or(existing.output_price_per_1m),
        source: SignalSource::Merged,
    }
}

/// 把信号合并进映射中的指定键
pub fn merge_into(map: &mut ExternalSignalMap, key: &str, incoming: ExternalSignal) {
    let merged = merge_signal(map.get(key), incoming);
    map.insert(key.to_string(), merged);
}

/// 按别名顺序查找模型对应的信号
pub fn find_signal<'a>(
    model: &DiscoveredModel,
    signals: Option<&'a ExternalSignalMap>,
) -> Option<&'a ExternalSignal> {
    let signals = signals?;
    if signals.is_empty() {
        return None;
    }
    build_model_key_aliases(&model.model)
        .iter()
        .find_map(|alias| signals.get(alias))
}
