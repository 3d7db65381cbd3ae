//! 规划配置
//!
//! Provider 开关、免费档与聚合 Provider 的固定模型、各角色的用户覆盖、均衡开关和评分引擎版本。
//! 配置文件按扩展名读写 JSON 或 YAML，文件不存在时使用默认配置。

use crate::errors::{ConfigError, ConfigResult};
use crate::planner::fallback::RolePins;
use crate::planner::model::split_model_id;
use crate::planner::provider;
use crate::planner::role::AgentRole;
use crate::planner::strategy::EngineVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 付费 Provider 开关
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderToggles {
    pub openai: bool,
    pub anthropic: bool,
    pub copilot: bool,
    pub zai_plan: bool,
    pub kimi: bool,
    pub google: bool,
    /// 聚合 Provider
    pub chutes: bool,
}

impl ProviderToggles {
    /// 是否启用了任一付费订阅（不含聚合 Provider）
    pub fn has_paid_provider(&self) -> bool {
        self.openai || self.anthropic || self.copilot || self.zai_plan || self.kimi || self.google
    }

    /// 按 Provider ID 判断
    pub fn is_enabled(&self, provider_id: &str) -> bool {
        match provider_id {
            provider::OPENAI => self.openai,
            provider::ANTHROPIC => self.anthropic,
            provider::GITHUB_COPILOT => self.copilot,
            provider::ZAI_CODING_PLAN => self.zai_plan,
            provider::KIMI_FOR_CODING => self.kimi,
            provider::GOOGLE => self.google,
            provider::CHUTES => self.chutes,
            _ => false,
        }
    }
}

/// 一个 Provider 上的两级固定模型
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PinnedTier {
    pub primary: Option<String>,
    pub secondary: Option<String>,
}

impl PinnedTier {
    pub fn new(primary: Option<&str>, secondary: Option<&str>) -> Self {
        Self {
            primary: primary.map(str::to_string),
            secondary: secondary.map(str::to_string),
        }
    }

    /// 角色使用的固定模型：快速角色优先 secondary
    pub fn for_role(&self, role: AgentRole) -> Option<&str> {
        if role.prefers_secondary_pin() {
            self.secondary.as_deref().or(self.primary.as_deref())
        } else {
            self.primary.as_deref()
        }
    }

    fn models(&self) -> impl Iterator<Item = &str> {
        self.primary.iter().chain(self.secondary.iter()).map(String::as_str)
    }
}

/// 用户手动指定的角色计划
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManualAgentPlan {
    pub primary: String,
    pub fallback1: String,
    pub fallback2: String,
    pub fallback3: String,
}

impl ManualAgentPlan {
    /// 非空条目，按优先级排列
    pub fn models(&self) -> Vec<String> {
        [&self.primary, &self.fallback1, &self.fallback2, &self.fallback3]
            .into_iter()
            .filter(|m| !m.trim().is_empty())
            .cloned()
            .collect()
    }
}

/// 规划配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerConfig {
    /// 付费与聚合 Provider 开关
    pub providers: ProviderToggles,
    /// 是否使用免费档模型
    pub use_opencode_free_models: bool,
    /// 免费档固定模型
    pub opencode_free: PinnedTier,
    /// 聚合 Provider 固定模型
    pub chutes: PinnedTier,
    /// 各角色的直接覆盖
    pub direct_overrides: BTreeMap<AgentRole, String>,
    /// 各角色的手动计划
    pub manual_plans: BTreeMap<AgentRole, ManualAgentPlan>,
    /// 各角色的固定模型
    pub pinned_models: BTreeMap<AgentRole, String>,
    /// 是否启用订阅均衡
    pub balance_provider_usage: bool,
    /// 评分引擎版本
    pub scoring_engine_version: EngineVersion,
}

impl PlannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_providers(mut self, providers: ProviderToggles) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_opencode_free(mut self, enabled: bool, pins: PinnedTier) -> Self {
        self.use_opencode_free_models = enabled;
        self.opencode_free = pins;
        self
    }

    pub fn with_chutes_pins(mut self, pins: PinnedTier) -> Self {
        self.chutes = pins;
        self
    }

    pub fn with_balance_provider_usage(mut self, enabled: bool) -> Self {
        self.balance_provider_usage = enabled;
        self
    }

    pub fn with_engine_version(mut self, version: EngineVersion) -> Self {
        self.scoring_engine_version = version;
        self
    }

    pub fn with_direct_override(mut self, role: AgentRole, model: &str) -> Self {
        self.direct_overrides.insert(role, model.to_string());
        self
    }

    pub fn with_manual_plan(mut self, role: AgentRole, plan: ManualAgentPlan) -> Self {
        self.manual_plans.insert(role, plan);
        self
    }

    pub fn with_pinned_model(mut self, role: AgentRole, model: &str) -> Self {
        self.pinned_models.insert(role, model.to_string());
        self
    }

    /// Provider 是否参与规划
    pub fn is_provider_enabled(&self, provider_id: &str) -> bool {
        if provider::is_free_tier(provider_id) {
            self.use_opencode_free_models
        } else {
            self.providers.is_enabled(provider_id)
        }
    }

    /// 角色在聚合 / 免费 Provider 上的固定模型，对应开关关闭时为空
    pub fn role_pins(&self, role: AgentRole) -> RolePins {
        RolePins {
            aggregator: self
                .providers
                .chutes
                .then(|| self.chutes.for_role(role))
                .flatten()
                .map(str::to_string),
            free: self
                .use_opencode_free_models
                .then(|| self.opencode_free.for_role(role))
                .flatten()
                .map(str::to_string),
        }
    }

    /// 校验所有模型 ID 为 `provider/id` 格式
    pub fn validate(&self) -> ConfigResult<()> {
        let pins = self
            .chutes
            .models()
            .map(|m| ("chutes".to_string(), m))
            .chain(self.opencode_free.models().map(|m| ("opencodeFree".to_string(), m)));
        let overrides = self
            .direct_overrides
            .iter()
            .map(|(role, m)| (format!("directOverrides.{role}"), m.as_str()));
        let pinned = self
            .pinned_models
            .iter()
            .map(|(role, m)| (format!("pinnedModels.{role}"), m.as_str()));
        let manual = self.manual_plans.iter().flat_map(|(role, plan)| {
            [&plan.primary, &plan.fallback1, &plan.fallback2, &plan.fallback3]
                .into_iter()
                .map(move |m| (format!("manualPlans.{role}"), m.as_str()))
        });

        for (field, value) in pins.chain(overrides).chain(pinned).chain(manual) {
            if !value.trim().is_empty() && split_model_id(value).is_none() {
                return Err(ConfigError::InvalidModelId {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// 默认配置文件路径
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rolecast")
        .join("config.json")
}

enum ConfigFormat {
    Json,
    Yaml,
}

fn detect_format(path: &Path) -> ConfigResult<ConfigFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" => Ok(ConfigFormat::Json),
        "yaml" | "yml" => Ok(ConfigFormat::Yaml),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// 加载配置，文件不存在时返回默认配置
pub fn load_config(path: &Path) -> ConfigResult<PlannerConfig> {
    let format = detect_format(path)?;
    if !path.exists() {
        tracing::debug!("配置文件不存在，使用默认配置: {}", path.display());
        return Ok(PlannerConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: PlannerConfig = match format {
        ConfigFormat::Json => serde_json::from_str(&content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(&content)?,
    };
    config.validate()?;
    Ok(config)
}

/// 保存配置，自动创建父目录
pub fn save_config(path: &Path, config: &PlannerConfig) -> ConfigResult<()> {
    let format = detect_format(path)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    std::fs::write(path, content)?;
    Ok(())
}
