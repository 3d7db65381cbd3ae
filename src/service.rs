//! 规划服务
//!
//! 加载配置，并发执行目录发现与外部信号拉取，再生成模型计划。

use anyhow::{Context, Result};
use rolecast_core::{
    build_dynamic_model_plan, default_config_path, load_config, DiscoveredModel, DynamicModelPlan, EngineVersion,
    PlannerConfig,
};
use rolecast_signals::{
    fetch_external_signals, CatalogDiscovery, CommandRunner, ProcessRunner, SignalFetchReport, SignalOptions,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 规划结果与采集过程中的警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub plan: DynamicModelPlan,
    pub warnings: Vec<String>,
    pub generated_at: String,
}

/// 规划服务
pub struct PlanningService<R: CommandRunner = ProcessRunner> {
    config_path: PathBuf,
    signal_options: SignalOptions,
    discovery: CatalogDiscovery<R>,
    engine_override: Option<EngineVersion>,
}

impl PlanningService<ProcessRunner> {
    /// 默认配置路径、环境变量中的 API Key 与子进程目录发现
    pub fn new() -> Self {
        Self::with_discovery(CatalogDiscovery::new())
    }
}

impl Default for PlanningService<ProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> PlanningService<R> {
    pub fn with_discovery(discovery: CatalogDiscovery<R>) -> Self {
        Self {
            config_path: default_config_path(),
            signal_options: SignalOptions::default(),
            discovery,
            engine_override: None,
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn with_signal_options(mut self, options: SignalOptions) -> Self {
        self.signal_options = options;
        self
    }

    /// 覆盖配置中的评分引擎版本
    pub fn with_engine_override(mut self, version: Option<EngineVersion>) -> Self {
        self.engine_override = version;
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 加载配置，发现目录并拉取信号，生成计划
    pub async fn plan(&self) -> Result<PlanReport> {
        let config = load_config(&self.config_path)
            .with_context(|| format!("加载配置失败: {}", self.config_path.display()))?;

        let (catalog, signals) = tokio::join!(
            self.discovery.discover_catalog(),
            fetch_external_signals(&self.signal_options)
        );
        let catalog = catalog.context("发现模型目录失败")?;

        self.plan_with_catalog(&catalog, &config, signals)
    }

    /// 使用已有的目录和信号生成计划
    pub fn plan_with_catalog(
        &self,
        catalog: &[DiscoveredModel],
        config: &PlannerConfig,
        signals: SignalFetchReport,
    ) -> Result<PlanReport> {
        for warning in &signals.warnings {
            warn!("{}", warning);
        }

        let plan = build_dynamic_model_plan(catalog, config, signals.signals(), self.engine_override)
            .context("生成模型计划失败")?;
        info!(
            "模型计划已生成: 引擎 {}, {} 条警告",
            plan.scoring.engine_version_applied,
            signals.warnings.len()
        );

        Ok(PlanReport {
            plan,
            warnings: signals.warnings,
            generated_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}
