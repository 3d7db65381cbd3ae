//! rolecast 采集层
//!
//! 为规划引擎准备输入：通过外部命令发现模型目录，从第三方榜单拉取质量、价格与延迟信号。
//! 所有 I/O 都在这里完成，失败转为警告返回给调用方。

pub mod artificial_analysis;
pub mod catalog;
pub mod errors;
pub mod openrouter;
pub mod source;

pub use artificial_analysis::ArtificialAnalysisSource;
pub use catalog::{parse_models_verbose_output, CatalogDiscovery, CommandOutput, CommandRunner, ProcessRunner};
pub use errors::{CatalogError, CatalogResult, SignalError, SignalResult};
pub use openrouter::OpenRouterSource;
pub use source::{
    fetch_external_signals, fetch_from_sources, ExternalSignalSource, SignalFetchReport, SignalOptions,
    ARTIFICIAL_ANALYSIS_API_KEY_ENV, DEFAULT_FETCH_TIMEOUT, OPENROUTER_API_KEY_ENV,
};
