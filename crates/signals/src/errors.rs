//! 采集层错误类型
//!
//! - SignalError（外部信号错误）
//! - CatalogError（模型目录错误）

use thiserror::Error;

/// 外部信号拉取错误
#[derive(Error, Debug)]
pub enum SignalError {
    /// HTTP 请求失败
    #[error("请求失败: {0}")]
    Http(#[from] reqwest::Error),

    /// 接口返回非成功状态码
    #[error("{provider} 请求失败 ({status})")]
    Status { provider: String, status: u16 },

    /// 响应解析失败
    #[error("解析响应失败: {0}")]
    Parse(#[from] serde_json::Error),
}

/// 模型目录发现错误
#[derive(Error, Debug)]
pub enum CatalogError {
    /// 无法启动命令
    #[error("无法运行 `{command}`: {message}")]
    Spawn { command: String, message: String },

    /// 命令以非零状态退出
    #[error("{0}")]
    CommandFailed(String),

    /// 命令执行超时
    #[error("`{command}` 执行超时 ({seconds} 秒)")]
    Timeout { command: String, seconds: u64 },
}

/// 外部信号结果类型
pub type SignalResult<T> = Result<T, SignalError>;

/// 模型目录结果类型
pub type CatalogResult<T> = Result<T, CatalogError>;
