//! 外部信号源与聚合
//!
//! 两个榜单并发拉取，失败的来源转为警告，其信号被忽略。

use crate::artificial_analysis::ArtificialAnalysisSource;
use crate::errors::SignalResult;
use crate::openrouter::OpenRouterSource;
use async_trait::async_trait;
use futures::future::join_all;
use rolecast_core::{build_model_key_aliases, merge_into, ExternalSignal, ExternalSignalMap};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Artificial Analysis API Key 环境变量
pub const ARTIFICIAL_ANALYSIS_API_KEY_ENV: &str = "ARTIFICIAL_ANALYSIS_API_KEY";
/// OpenRouter API Key 环境变量
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";
/// 单个来源的请求超时
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// 外部信号源
#[async_trait]
pub trait ExternalSignalSource: Send + Sync {
    /// 来源显示名称，用于警告信息
    fn name(&self) -> &str;

    /// 拉取并转换为以别名为键的信号映射
    async fn fetch(&self) -> SignalResult<ExternalSignalMap>;
}

/// 信号拉取选项
#[derive(Debug, Clone)]
pub struct SignalOptions {
    pub artificial_analysis_api_key: Option<String>,
    pub open_router_api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for SignalOptions {
    fn default() -> Self {
        Self {
            artificial_analysis_api_key: None,
            open_router_api_key: None,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl SignalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artificial_analysis_key(mut self, key: impl Into<String>) -> Self {
        self.artificial_analysis_api_key = Some(key.into());
        self
    }

    pub fn with_open_router_key(mut self, key: impl Into<String>) -> Self {
        self.open_router_api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 选项中的 Key，缺失时读取环境变量
    pub fn artificial_analysis_key(&self) -> Option<String> {
        self.artificial_analysis_api_key
            .clone()
            .or_else(|| non_empty_env(ARTIFICIAL_ANALYSIS_API_KEY_ENV))
    }

    /// 选项中的 Key，缺失时读取环境变量
    pub fn open_router_key(&self) -> Option<String> {
        self.open_router_api_key
            .clone()
            .or_else(|| non_empty_env(OPENROUTER_API_KEY_ENV))
    }
}

/// 信号拉取结果
#[derive(Debug, Clone, Default)]
pub struct SignalFetchReport {
    pub signals: ExternalSignalMap,
    pub warnings: Vec<String>,
}

impl SignalFetchReport {
    /// 有信号时返回映射引用，供规划使用
    pub fn signals(&self) -> Option<&ExternalSignalMap> {
        (!self.signals.is_empty()).then_some(&self.signals)
    }
}

/// 把键规范化后展开为别名
pub(crate) fn key_aliases(key: &str) -> Vec<String> {
    build_model_key_aliases(&key.trim().to_lowercase())
}

/// 给不带 Provider 前缀的别名加上前缀
pub(crate) fn provider_scoped_alias(alias: &str, provider_prefix: Option<&str>) -> String {
    match provider_prefix {
        Some(prefix) if !alias.contains('/') => format!("{prefix}/{alias}"),
        _ => alias.to_string(),
    }
}

/// 以别名写入信号
///
/// 带 `/` 的别名或没有 Provider 前缀时原样写入，其余别名只以带前缀的形式写入。
pub(crate) fn insert_with_aliases(
    map: &mut ExternalSignalMap,
    key: &str,
    provider_prefix: Option<&str>,
    signal: &ExternalSignal,
) {
    let mut seen = HashSet::new();
    for alias in key_aliases(key) {
        let scoped = provider_scoped_alias(&alias, provider_prefix);
        if seen.insert(scoped.clone()) {
            merge_into(map, &scoped, signal.clone());
        }
    }
}

/// 并发拉取所有来源，按来源顺序合并
pub async fn fetch_from_sources(sources: &[Box<dyn ExternalSignalSource>]) -> SignalFetchReport {
    let results = join_all(sources.iter().map(|source| source.fetch())).await;

    let mut report = SignalFetchReport::default();
    for (source, result) in sources.iter().zip(results) {
        match result {
            Ok(map) => {
                debug!("{} 返回 {} 条信号", source.name(), map.len());
                let mut entries: Vec<(String, ExternalSignal)> = map.into_iter().collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                for (key, signal) in entries {
                    merge_into(&mut report.signals, &key, signal);
                }
            }
            Err(e) => {
                warn!("外部信号源 {} 不可用: {}", source.name(), e);
                report.warnings.push(format!("{} 不可用: {}", source.name(), e));
            }
        }
    }
    report
}

/// 按选项拉取外部信号，没有 Key 的来源被跳过
pub async fn fetch_external_signals(options: &SignalOptions) -> SignalFetchReport {
    let mut sources: Vec<Box<dyn ExternalSignalSource>> = Vec::new();
    let mut warnings = Vec::new();

    if let Some(key) = options.artificial_analysis_key() {
        match ArtificialAnalysisSource::new(key, options.timeout) {
            Ok(source) => sources.push(Box::new(source)),
            Err(e) => warnings.push(format!("Artificial Analysis 不可用: {e}")),
        }
    }
    if let Some(key) = options.open_router_key() {
        match OpenRouterSource::new(key, options.timeout) {
            Ok(source) => sources.push(Box::new(source)),
            Err(e) => warnings.push(format!("OpenRouter 不可用: {e}")),
        }
    }

    if sources.is_empty() && warnings.is_empty() {
        debug!("未配置外部信号 API Key，跳过拉取");
        return SignalFetchReport::default();
    }

    let mut report = fetch_from_sources(&sources).await;
    warnings.append(&mut report.warnings);
    report.warnings = warnings;
    report
}
