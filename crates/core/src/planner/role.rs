//! Agent 角色定义
//!
//! 定义六个固定角色、它们的分配顺序以及每个角色的固定参数。

use serde::{Deserialize, Serialize};

/// Agent 角色
///
/// 角色集合是进程级常量，不从输入推导。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// 顶层协调者
    Orchestrator,
    /// 深度推理
    Oracle,
    /// 设计评审
    Designer,
    /// 快速探索
    Explorer,
    /// 长上下文调研
    Librarian,
    /// 快速修复
    Fixer,
}

impl AgentRole {
    /// 所有角色（声明顺序）
    pub const ALL: [AgentRole; 6] = [
        AgentRole::Orchestrator,
        AgentRole::Oracle,
        AgentRole::Designer,
        AgentRole::Explorer,
        AgentRole::Librarian,
        AgentRole::Fixer,
    ];

    /// 主分配顺序
    ///
    /// 先处理的角色优先占用稀缺的高质量 Provider，顺序不可调整。
    pub const ASSIGNMENT_ORDER: [AgentRole; 6] = [
        AgentRole::Oracle,
        AgentRole::Orchestrator,
        AgentRole::Fixer,
        AgentRole::Designer,
        AgentRole::Librarian,
        AgentRole::Explorer,
    ];

    /// 角色名称（与配置文件中的键一致）
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Orchestrator => "orchestrator",
            AgentRole::Oracle => "oracle",
            AgentRole::Designer => "designer",
            AgentRole::Explorer => "explorer",
            AgentRole::Librarian => "librarian",
            AgentRole::Fixer => "fixer",
        }
    }

    /// 获取角色的描述
    pub fn description(&self) -> &'static str {
        match self {
            AgentRole::Orchestrator => "顶层协调，负责任务拆分与委派",
            AgentRole::Oracle => "深度推理，处理最难的问题",
            AgentRole::Designer => "设计评审与界面相关工作",
            AgentRole::Explorer => "快速探索代码库",
            AgentRole::Librarian => "长上下文资料调研",
            AgentRole::Fixer => "快速实现与修复",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "orchestrator" => Some(AgentRole::Orchestrator),
            "oracle" => Some(AgentRole::Oracle),
            "designer" => Some(AgentRole::Designer),
            "explorer" | "explore" => Some(AgentRole::Explorer),
            "librarian" => Some(AgentRole::Librarian),
            "fixer" => Some(AgentRole::Fixer),
            _ => None,
        }
    }

    /// 分配结果附带的推理强度档位
    pub fn variant(&self) -> Option<&'static str> {
        match self {
            AgentRole::Orchestrator => None,
            AgentRole::Oracle => Some("high"),
            AgentRole::Designer => Some("medium"),
            AgentRole::Explorer | AgentRole::Librarian | AgentRole::Fixer => Some("low"),
        }
    }

    /// 该角色是否必须使用支持工具调用的模型
    pub fn requires_toolcall(&self) -> bool {
        matches!(
            self,
            AgentRole::Orchestrator | AgentRole::Explorer | AgentRole::Librarian | AgentRole::Fixer
        )
    }

    /// 是否使用次级固定模型（免费档 / 聚合 Provider 的 secondary 选择）
    pub fn prefers_secondary_pin(&self) -> bool {
        matches!(
            self,
            AgentRole::Explorer | AgentRole::Librarian | AgentRole::Fixer
        )
    }

    /// 质量窗口：与最高原始分的差距在该范围内的候选仍参与多样性选择
    pub fn quality_window(&self) -> f64 {
        match self {
            AgentRole::Oracle | AgentRole::Orchestrator => 12.0,
            AgentRole::Fixer => 15.0,
            AgentRole::Designer => 16.0,
            AgentRole::Librarian => 18.0,
            AgentRole::Explorer => 22.0,
        }
    }

    /// 同一 Provider 第二个候选进入降级链的最大分差
    pub fn bundle_tolerance(&self) -> f64 {
        match self {
            AgentRole::Oracle | AgentRole::Orchestrator => 8.0,
            AgentRole::Designer | AgentRole::Librarian => 12.0,
            AgentRole::Fixer => 15.0,
            AgentRole::Explorer => 18.0,
        }
    }

    /// flash 变体取代非 flash 变体作为 Provider 代表所需的分差
    pub fn flash_representative_threshold(&self) -> f64 {
        match self {
            AgentRole::Explorer => -6.0,
            _ => 12.0,
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
