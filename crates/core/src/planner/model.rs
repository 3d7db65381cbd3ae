//! 候选模型定义
//!
//! 模型目录中的单个条目，由目录发现层生成，生成后不可变。

use serde::{Deserialize, Serialize};

/// 模型生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    #[default]
    Active,
    Beta,
    Alpha,
    Deprecated,
}

/// 已发现的模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredModel {
    /// Provider ID
    #[serde(rename = "providerID")]
    pub provider_id: String,
    /// 完整模型 ID（`provider/id`）
    pub model: String,
    /// 显示名称
    pub name: String,
    /// 生命周期状态
    #[serde(default)]
    pub status: ModelStatus,
    /// 上下文长度
    #[serde(default)]
    pub context_limit: u64,
    /// 最大输出长度
    #[serde(default)]
    pub output_limit: u64,
    /// 是否支持推理
    #[serde(default)]
    pub reasoning: bool,
    /// 是否支持工具调用
    #[serde(default)]
    pub toolcall: bool,
    /// 是否支持附件输入
    #[serde(default)]
    pub attachment: bool,
    /// 每日请求上限
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_request_limit: Option<u64>,
    /// 输入价格
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_input: Option<f64>,
    /// 输出价格
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_output: Option<f64>,
}

impl DiscoveredModel {
    /// 从 Provider 和模型 ID 创建，其余字段取默认值
    pub fn new(provider_id: &str, model_id: &str) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            model: format!("{provider_id}/{model_id}"),
            name: model_id.to_string(),
            status: ModelStatus::Active,
            context_limit: 0,
            output_limit: 0,
            reasoning: false,
            toolcall: false,
            attachment: false,
            daily_request_limit: None,
            cost_input: None,
            cost_output: None,
        }
    }

    /// 从完整 ID（`provider/id`）创建，格式不合法时返回 None
    pub fn from_full_id(full_id: &str) -> Option<Self> {
        let (provider, model_id) = split_model_id(full_id)?;
        Some(Self::new(provider, model_id))
    }

    /// 不带 Provider 前缀的模型 ID
    pub fn model_id(&self) -> &str {
        self.model
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.model)
    }

    /// 用于名称特征匹配的文本（ID + 显示名称，小写）
    pub fn search_text(&self) -> String {
        format!("{} {}", self.model, self.name).to_lowercase()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_status(mut self, status: ModelStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_limits(mut self, context_limit: u64, output_limit: u64) -> Self {
        self.context_limit = context_limit;
        self.output_limit = output_limit;
        self
    }

    pub fn with_capabilities(mut self, reasoning: bool, toolcall: bool, attachment: bool) -> Self {
        self.reasoning = reasoning;
        self.toolcall = toolcall;
        self.attachment = attachment;
        self
    }
}

/// 拆分完整模型 ID，只在第一个 `/` 处拆分
///
/// Provider 与模型部分都必须非空。
pub fn split_model_id(full_id: &str) -> Option<(&str, &str)> {
    let (provider, model_id) = full_id.split_once('/')?;
    if provider.is_empty() || model_id.is_empty() {
        return None;
    }
    Some((provider, model_id))
}

/// 完整模型 ID 的 Provider 部分
pub fn provider_of(full_id: &str) -> &str {
    full_id.split('/').next().unwrap_or_default()
}
