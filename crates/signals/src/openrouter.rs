//! OpenRouter 模型列表
//!
//! 只提供价格，按 token 计价的字符串换算为每百万 token 价格。

use crate::errors::{SignalError, SignalResult};
use crate::source::{insert_with_aliases, ExternalSignalSource};
use async_trait::async_trait;
use rolecast_core::{ExternalSignal, ExternalSignalMap, SignalSource};
use serde::Deserialize;
use std::time::Duration;

const OPENROUTER_MODELS_URL: &str = "https://openrouter.ai/api/v1/models";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OrModelsResponse {
    #[serde(default)]
    data: Vec<OrModel>,
}

#[derive(Debug, Default, Deserialize)]
struct OrModel {
    id: Option<String>,
    #[serde(default)]
    pricing: OrPricing,
}

#[derive(Debug, Default, Deserialize)]
struct OrPricing {
    prompt: Option<String>,
    completion: Option<String>,
}

/// 每 token 价格字符串转为每百万 token 价格
fn parse_price(value: Option<&str>) -> Option<f64> {
    let parsed: f64 = value?.trim().parse().ok()?;
    parsed.is_finite().then(|| parsed * 1_000_000.0)
}

pub(crate) fn signals_from_response(response: OrModelsResponse) -> ExternalSignalMap {
    let mut map = ExternalSignalMap::new();
    for model in &response.data {
        let Some(id) = model.id.as_deref().filter(|id| !id.trim().is_empty()) else {
            continue;
        };
        let key = id.trim().to_lowercase();
        let prefix = key.split_once('/').map(|(prefix, _)| prefix);
        let signal = ExternalSignal::new(SignalSource::OpenRouter).with_prices(
            parse_price(model.pricing.prompt.as_deref()),
            parse_price(model.pricing.completion.as_deref()),
        );
        insert_with_aliases(&mut map, &key, prefix, &signal);
    }
    map
}

/// OpenRouter 信号源
pub struct OpenRouterSource {
    api_key: String,
    url: String,
    client: reqwest::Client,
}

impl OpenRouterSource {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> SignalResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key: api_key.into(),
            url: OPENROUTER_MODELS_URL.to_string(),
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
impl ExternalSignalSource for OpenRouterSource {
    fn name(&self) -> &str {
        "OpenRouter"
    }

    async fn fetch(&self) -> SignalResult<ExternalSignalMap> {
        let response = self
            .client
            .get(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SignalError::Status {
                provider: self.name().to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let parsed: OrModelsResponse = serde_json::from_str(&body)?;
        Ok(signals_from_response(parsed))
    }
}
