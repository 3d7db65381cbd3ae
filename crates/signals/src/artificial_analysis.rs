//! Artificial Analysis 榜单
//!
//! 提供综合智能指数、代码指数、首 token 延迟与价格。

use crate::errors::{SignalError, SignalResult};
use crate::source::{insert_with_aliases, ExternalSignalSource};
use async_trait::async_trait;
use rolecast_core::{provider, ExternalSignal, ExternalSignalMap, SignalSource};
use serde::Deserialize;
use std::time::Duration;

const ARTIFICIAL_ANALYSIS_MODELS_URL: &str = "https://artificialanalysis.ai/api/v2/data/llms/models";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AaModelsResponse {
    #[serde(default)]
    data: Vec<AaModel>,
}

#[derive(Debug, Default, Deserialize)]
struct AaModel {
    id: Option<String>,
    name: Option<String>,
    slug: Option<String>,
    model_creator: Option<AaCreator>,
    #[serde(default)]
    evaluations: AaEvaluations,
    #[serde(default)]
    pricing: AaPricing,
    median_time_to_first_token_seconds: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct AaCreator {
    slug: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AaEvaluations {
    artificial_analysis_intelligence_index: Option<f64>,
    artificial_analysis_coding_index: Option<f64>,
    livecodebench: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct AaPricing {
    price_1m_input_tokens: Option<f64>,
    price_1m_output_tokens: Option<f64>,
    price_1m_blended_3_to_1: Option<f64>,
}

/// 由模型创建者 slug 推断 Provider 前缀
fn provider_prefix_from_creator(creator_slug: Option<&str>) -> Option<&'static str> {
    let slug = creator_slug?.to_lowercase();
    if slug.contains("openai") {
        Some(provider::OPENAI)
    } else if slug.contains("anthropic") {
        Some(provider::ANTHROPIC)
    } else if slug.contains("google") {
        Some(provider::GOOGLE)
    } else if slug.contains("chutes") {
        Some(provider::CHUTES)
    } else if slug.contains("copilot") || slug.contains("github") {
        Some(provider::GITHUB_COPILOT)
    } else if slug.contains("zai") || slug.contains("z-ai") {
        Some(provider::ZAI_CODING_PLAN)
    } else if slug.contains("kimi") {
        Some(provider::KIMI_FOR_CODING)
    } else if slug.contains("opencode") {
        Some(provider::OPENCODE)
    } else {
        None
    }
}

impl AaModel {
    fn to_signal(&self) -> ExternalSignal {
        let blended = self.pricing.price_1m_blended_3_to_1;
        let mut signal = ExternalSignal::new(SignalSource::ArtificialAnalysis).with_prices(
            self.pricing.price_1m_input_tokens.or(blended),
            self.pricing.price_1m_output_tokens.or(blended),
        );
        signal.quality_score = self.evaluations.artificial_analysis_intelligence_index;
        signal.coding_score = self
            .evaluations
            .artificial_analysis_coding_index
            .or(self.evaluations.livecodebench);
        signal.latency_seconds = self.median_time_to_first_token_seconds;
        signal
    }
}

/// 把响应转换为信号映射
///
/// id / slug / name 各自展开别名；有创建者前缀时额外写入带前缀的别名。
pub(crate) fn signals_from_response(response: AaModelsResponse) -> ExternalSignalMap {
    let mut map = ExternalSignalMap::new();
    for model in &response.data {
        let signal = model.to_signal();
        let prefix = provider_prefix_from_creator(model.model_creator.as_ref().and_then(|c| c.slug.as_deref()));

        for key in [&model.id, &model.slug, &model.name].into_iter().flatten() {
            if key.trim().is_empty() {
                continue;
            }
            insert_with_aliases(&mut map, key, prefix, &signal);
        }
    }
    map
}

/// Artificial Analysis 信号源
pub struct ArtificialAnalysisSource {
    api_key: String,
    url: String,
    client: reqwest::Client,
}

impl ArtificialAnalysisSource {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> SignalResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key: api_key.into(),
            url: ARTIFICIAL_ANALYSIS_MODELS_URL.to_string(),
            client,
        })
    }

    /// 使用自定义接口地址
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl ExternalSignalSource for ArtificialAnalysisSource {
    fn name(&self) -> &str {
        "Artificial Analysis"
    }

    async fn fetch(&self) -> SignalResult<ExternalSignalMap> {
        let response = self
            .client
            .get(&self.url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SignalError::Status {
                provider: self.name().to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: AaModelsResponse = serde_json::from_str(&body)?;
        Ok(signals_from_response(parsed))
    }
}
