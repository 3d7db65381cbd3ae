//! 规划相关错误类型
//!
//! - PlanError（规划错误）
//! - ConfigError（配置错误）

use thiserror::Error;

// ============================================================================
// 配置错误
// ============================================================================

/// 配置加载、保存与校验错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON 解析错误
    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML 解析错误
    #[error("YAML 解析错误: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// 不支持的配置文件格式
    #[error("不支持的配置文件格式: {0}")]
    UnsupportedFormat(String),

    /// 模型 ID 格式不合法
    #[error("模型 ID 格式不合法 ({field}): {value}")]
    InvalidModelId { field: String, value: String },
}

impl From<ConfigError> for String {
    fn from(err: ConfigError) -> Self {
        err.to_string()
    }
}

// ============================================================================
// 规划错误
// ============================================================================

/// 生成模型计划时的错误
#[derive(Error, Debug)]
pub enum PlanError {
    /// 按 Provider 过滤后没有可用的候选模型
    #[error("没有可用的候选模型，请启用更多 Provider")]
    NoEligibleModels,

    /// 配置不合法
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

impl From<PlanError> for String {
    fn from(err: PlanError) -> Self {
        err.to_string()
    }
}

impl serde::Serialize for PlanError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// 规划结果类型
pub type PlanResult<T> = Result<T, PlanError>;

/// 配置结果类型
pub type ConfigResult<T> = Result<T, ConfigError>;
