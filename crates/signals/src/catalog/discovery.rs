//! 模型目录发现
//!
//! 运行 `opencode models --refresh --verbose` 并解析输出。

use super::parser::parse_models_verbose_output;
use crate::errors::{CatalogError, CatalogResult};
use async_trait::async_trait;
use rolecast_core::{provider, DiscoveredModel};
use std::time::Duration;
use tracing::{debug, info};

/// 默认可执行文件
pub const DEFAULT_OPENCODE_BINARY: &str = "opencode";
/// 可执行文件路径的环境变量
pub const OPENCODE_PATH_ENV: &str = "OPENCODE_PATH";
/// 默认执行超时
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(60);

const MODELS_ARGS: [&str; 3] = ["models", "--refresh", "--verbose"];

/// 命令执行结果
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// 外部命令执行器
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> CatalogResult<CommandOutput>;
}

/// 基于子进程的执行器
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_DISCOVERY_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[&str]) -> CatalogResult<CommandOutput> {
        let command_line = format!("{} {}", program, args.join(" "));
        let child = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| CatalogError::Timeout {
                command: command_line.clone(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| CatalogError::Spawn {
                command: command_line,
                message: e.to_string(),
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// 模型目录发现
pub struct CatalogDiscovery<R: CommandRunner = ProcessRunner> {
    runner: R,
    binary: String,
}

impl CatalogDiscovery<ProcessRunner> {
    /// 使用子进程执行器，可执行文件取环境变量或默认值
    pub fn new() -> Self {
        let binary = std::env::var(OPENCODE_PATH_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OPENCODE_BINARY.to_string());
        Self::with_runner(ProcessRunner::default()).with_binary(binary)
    }
}

impl Default for CatalogDiscovery<ProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> CatalogDiscovery<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            binary: DEFAULT_OPENCODE_BINARY.to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn discover(&self, provider_filter: Option<&str>, free_only: bool) -> CatalogResult<Vec<DiscoveredModel>> {
        debug!("运行 {} {}", self.binary, MODELS_ARGS.join(" "));
        let output = self.runner.run(&self.binary, &MODELS_ARGS).await?;
        if !output.success {
            let stderr = output.stderr.trim();
            let message = if stderr.is_empty() {
                "获取 OpenCode 模型列表失败".to_string()
            } else {
                stderr.to_string()
            };
            return Err(CatalogError::CommandFailed(message));
        }

        let models = parse_models_verbose_output(&output.stdout, provider_filter, free_only);
        info!("发现 {} 个模型", models.len());
        Ok(models)
    }

    /// 完整模型目录
    pub async fn discover_catalog(&self) -> CatalogResult<Vec<DiscoveredModel>> {
        self.discover(None, false).await
    }

    /// 指定 Provider 的全部模型
    pub async fn discover_provider_models(&self, provider_id: &str) -> CatalogResult<Vec<DiscoveredModel>> {
        self.discover(Some(provider_id), false).await
    }

    /// 指定 Provider 的免费模型
    pub async fn discover_provider_free_models(&self, provider_id: &str) -> CatalogResult<Vec<DiscoveredModel>> {
        self.discover(Some(provider_id), true).await
    }

    /// 免费档 Provider 的免费模型
    pub async fn discover_free_tier_models(&self) -> CatalogResult<Vec<DiscoveredModel>> {
        self.discover_provider_free_models(provider::OPENCODE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct MockRunner {
        output: CommandOutput,
        calls: Mutex<Vec<String>>,
    }

    impl MockRunner {
        fn new(success: bool, stdout: &str, stderr: &str) -> Self {
            Self {
                output: CommandOutput {
                    success,
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                },
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for MockRunner {
        async fn run(&self, program: &str, args: &[&str]) -> CatalogResult<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{} {}", program, args.join(" ")));
            Ok(self.output.clone())
        }
    }

    const STDOUT: &str = "opencode/big-pickle\n{\"id\": \"big-pickle\", \"providerID\": \"opencode\"}\nopenai/gpt-5.3-codex\n{\"id\": \"gpt-5.3-codex\", \"providerID\": \"openai\", \"cost\": {\"input\": 1.25}}\n";

    #[tokio::test]
    async fn test_discover_catalog() {
        let discovery = CatalogDiscovery::with_runner(MockRunner::new(true, STDOUT, "")).with_binary("/usr/local/bin/opencode");

        let models = discovery.discover_catalog().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(
            discovery.runner.calls.lock().unwrap()[0],
            "/usr/local/bin/opencode models --refresh --verbose"
        );

        let free = discovery.discover_free_tier_models().await.unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].model, "opencode/big-pickle");

        let openai = discovery.discover_provider_models("openai").await.unwrap();
        assert_eq!(openai[0].cost_input, Some(1.25));
        assert!(discovery.discover_provider_free_models("openai").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_command_failure() {
        let discovery = CatalogDiscovery::with_runner(MockRunner::new(false, "", "  auth required \n"));
        let err = discovery.discover_catalog().await.unwrap_err();
        assert_eq!(err.to_string(), "auth required");

        let discovery = CatalogDiscovery::with_runner(MockRunner::new(false, "", ""));
        let err = discovery.discover_catalog().await.unwrap_err();
        assert_eq!(err.to_string(), "获取 OpenCode 模型列表失败");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let runner = ProcessRunner::new(Duration::from_secs(5));
        let err = runner
            .run("rolecast-definitely-missing-binary", &["models"])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Spawn { .. }));
    }
}
