//! 版本新旧分析
//!
//! 从模型 ID 与名称中推断家族和版本号，按同家族内的新旧程度给出加分。
//! 通用匹配规则可能把不相关的家族归为一组，属于可接受的误差。

use super::model::DiscoveredModel;
use crate::cached_regex;
use regex::Captures;
use std::collections::{BTreeSet, HashMap};

/// 完整模型 ID → 版本加分
pub type RecencyMap = HashMap<String, f64>;

/// 版本加分下限
pub const RECENCY_MIN: f64 = -3.0;
/// 版本加分上限
pub const RECENCY_MAX: f64 = 12.0;

cached_regex!(gpt_re, r"\bgpt[-_ ]?(\d+)(?:[.-](\d+))?(?:[.-](\d+))?\b");
cached_regex!(gemini_re, r"\bgemini[-_ ]?(\d+)(?:[.-](\d+))?(?:[.-](\d+))?\b");
cached_regex!(kimi_re, r"\bkimi[-_ ]?k(\d+)(?:[.-]?(\d+))?(?:[.-](\d+))?\b");
cached_regex!(
    generic_re,
    r"\b([a-z][a-z0-9-]{1,20})[-_ ](\d+)(?:[.-](\d+))?(?:[.-](\d+))?\b"
);
cached_regex!(prerelease_re, r"preview|experimental|exp|\brc\b");

type VersionTuple = (u64, u64, u64);

/// 推断出的版本家族
#[derive(Debug, Clone, PartialEq)]
struct VersionFamily {
    family: String,
    version: VersionTuple,
    confidence: f64,
    prerelease_penalty: f64,
}

fn parse_part(captures: &Captures<'_>, index: usize) -> u64 {
    captures
        .get(index)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn extract_version_family(model: &DiscoveredModel) -> Option<VersionFamily> {
    let text = model.search_text();
    let prerelease_penalty = if prerelease_re().is_match(&text) {
        -2.0
    } else {
        0.0
    };

    let known = [("gpt", gpt_re()), ("gemini", gemini_re()), ("kimi-k", kimi_re())];
    for (family, re) in known {
        if let Some(captures) = re.captures(&text) {
            return Some(VersionFamily {
                family: family.to_string(),
                version: (
                    parse_part(&captures, 1),
                    parse_part(&captures, 2),
                    parse_part(&captures, 3),
                ),
                confidence: 1.0,
                prerelease_penalty,
            });
        }
    }

    let captures = generic_re().captures(&text)?;
    Some(VersionFamily {
        family: captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "generic".to_string()),
        version: (
            parse_part(&captures, 2),
            parse_part(&captures, 3),
            parse_part(&captures, 4),
        ),
        confidence: 0.7,
        prerelease_penalty,
    })
}

/// 计算目录中每个模型的版本加分，取值范围 [-3, 12]
///
/// 无法识别版本的模型加分为 0。同家族只有一个版本时按中位处理。
pub fn version_recency_map(models: &[DiscoveredModel]) -> RecencyMap {
    let infos: Vec<(&DiscoveredModel, Option<VersionFamily>)> = models
        .iter()
        .map(|model| (model, extract_version_family(model)))
        .collect();

    let mut family_versions: HashMap<&str, BTreeSet<VersionTuple>> = HashMap::new();
    for (_, info) in &infos {
        if let Some(info) = info {
            family_versions
                .entry(info.family.as_str())
                .or_default()
                .insert(info.version);
        }
    }

    let mut recency = RecencyMap::with_capacity(models.len());
    for (model, info) in &infos {
        let Some(info) = info else {
            recency.insert(model.model.clone(), 0.0);
            continue;
        };

        let Some(unique) = family_versions.get(info.family.as_str()) else {
            recency.insert(model.model.clone(), 0.0);
            continue;
        };

        let percentile = if unique.len() <= 1 {
            0.5
        } else {
            let index = unique.iter().position(|v| *v == info.version).unwrap_or(0);
            index as f64 / (unique.len() - 1) as f64
        };
        let raw = RECENCY_MIN + percentile * (RECENCY_MAX - RECENCY_MIN);
        let value = (raw * info.confidence + info.prerelease_penalty).clamp(RECENCY_MIN, RECENCY_MAX);
        recency.insert(model.model.clone(), value);
    }

    recency
}
