//! `opencode models --verbose` 输出解析
//!
//! 输出由 `provider/model` 标题行和紧随其后的 JSON 块组成，格式不合法的块被跳过。

use rolecast_core::{cached_regex, DiscoveredModel, ModelStatus};
use serde::Deserialize;

cached_regex!(header_re, r"(?i)^[a-z0-9-]+/.+$");
cached_regex!(daily_limit_re, r"\b(300|2000|5000)\b");

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerboseRecord {
    id: String,
    #[serde(rename = "providerID")]
    provider_id: String,
    name: Option<String>,
    status: Option<ModelStatus>,
    #[serde(default)]
    cost: RecordCost,
    #[serde(default)]
    limit: RecordLimit,
    #[serde(default)]
    capabilities: RecordCapabilities,
    #[serde(default)]
    quota: RecordQuota,
    #[serde(default)]
    meta: RecordMeta,
}

#[derive(Debug, Default, Deserialize)]
struct RecordCost {
    input: Option<f64>,
    output: Option<f64>,
    #[serde(default)]
    cache: RecordCacheCost,
}

#[derive(Debug, Default, Deserialize)]
struct RecordCacheCost {
    read: Option<f64>,
    write: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordLimit {
    context: Option<u64>,
    output: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordCapabilities {
    reasoning: Option<bool>,
    toolcall: Option<bool>,
    attachment: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordQuota {
    requests_per_day: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordMeta {
    requests_per_day: Option<f64>,
    daily_limit: Option<f64>,
}

impl VerboseRecord {
    /// 四项价格都为 0（缺失按 0 计）
    fn is_free(&self) -> bool {
        [
            self.cost.input,
            self.cost.output,
            self.cost.cache.read,
            self.cost.cache.write,
        ]
        .iter()
        .all(|cost| cost.unwrap_or(0.0) == 0.0)
    }

    /// 显式配额优先，否则从名称中的 300 / 2000 / 5000 推断
    fn daily_request_limit(&self) -> Option<u64> {
        let explicit = self
            .quota
            .requests_per_day
            .or(self.meta.requests_per_day)
            .or(self.meta.daily_limit);
        if let Some(limit) = explicit.filter(|v| v.is_finite() && *v >= 0.0) {
            return Some(limit as u64);
        }

        let text = format!("{} {}", self.id, self.name.as_deref().unwrap_or_default()).to_lowercase();
        daily_limit_re()
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn into_model(self) -> DiscoveredModel {
        let daily_request_limit = self.daily_request_limit();
        let mut model = DiscoveredModel::new(&self.provider_id, &self.id)
            .with_name(self.name.as_deref().unwrap_or(&self.id))
            .with_status(self.status.unwrap_or_default())
            .with_limits(
                self.limit.context.unwrap_or(0),
                self.limit.output.unwrap_or(0),
            )
            .with_capabilities(
                self.capabilities.reasoning.unwrap_or(false),
                self.capabilities.toolcall.unwrap_or(false),
                self.capabilities.attachment.unwrap_or(false),
            );
        model.daily_request_limit = daily_request_limit;
        model.cost_input = self.cost.input;
        model.cost_output = self.cost.output;
        model
    }
}

fn is_header(line: &str) -> bool {
    header_re().is_match(line.trim())
}

/// 从 `start` 开始按花括号深度截取 JSON 块，返回块内容和结束行号
fn scan_json_block(lines: &[&str], start: usize) -> Option<(String, usize)> {
    let mut depth: i64 = 0;
    let mut block = Vec::new();
    for (cursor, line) in lines.iter().enumerate().skip(start) {
        block.push(*line);
        for ch in line.chars() {
            match ch {
                '{' => depth += 1,
                '}' => depth -= 1,
                _ => {}
            }
        }
        if depth == 0 {
            return Some((block.join("\n"), cursor));
        }
    }
    None
}

/// 解析 verbose 输出
///
/// `provider_filter` 只保留指定 Provider；`free_only` 只保留免费模型。
pub fn parse_models_verbose_output(
    output: &str,
    provider_filter: Option<&str>,
    free_only: bool,
) -> Vec<DiscoveredModel> {
    let lines: Vec<&str> = output.lines().collect();
    let mut models = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index].trim();
        if line.is_empty() || !is_header(line) {
            index += 1;
            continue;
        }

        let json_start = lines
            .iter()
            .enumerate()
            .skip(index + 1)
            .take_while(|(_, l)| !is_header(l))
            .find(|(_, l)| l.trim().starts_with('{'))
            .map(|(i, _)| i);
        let Some(json_start) = json_start else {
            index += 1;
            continue;
        };
        let Some((block, json_end)) = scan_json_block(&lines, json_start) else {
            index += 1;
            continue;
        };

        match serde_json::from_str::<VerboseRecord>(&block) {
            Ok(record) => {
                let provider_ok = provider_filter.map_or(true, |p| record.provider_id == p);
                if provider_ok && (!free_only || record.is_free()) {
                    models.push(record.into_model());
                }
            }
            Err(e) => {
                tracing::debug!("跳过无法解析的模型块 {}: {}", line, e);
            }
        }
        index = json_end + 1;
    }

    models
}
