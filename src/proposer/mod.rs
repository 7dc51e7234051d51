// ==========================================
// 车间工单排产系统 - 改进建议接口
// ==========================================
// 职责: 定义外部改进建议提供方 trait,实现依赖倒置
// 说明: 引擎层只消费 trait,提供方可以是启发式、搜索算法或远程服务
// 红线: 返回内容必须先通过模式校验才能应用,不可解析视为空建议
// ==========================================

use crate::domain::{Employee, IterationRecord, ProductionStep, ScheduledTask};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ==========================================
// 建议内容模型
// ==========================================

/// 单个任务的字段级编辑
///
/// changes 的键限定为: employee_id / day / time_slot / station_id,
/// 其余键在应用阶段整条拒绝。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskModification {
    /// 目标任务ID (ScheduledTask::task_id)
    pub task_id: String,
    /// 字段名 -> 新值
    pub changes: serde_json::Map<String, Value>,
}

/// 一轮改进建议
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleProposal {
    #[serde(default)]
    pub modifications: Vec<TaskModification>,

    /// 建议理由 (自由文本,仅用于日志)
    #[serde(default)]
    pub rationale: Option<String>,
}

impl ScheduleProposal {
    /// 空建议 (等价于"本轮不改")
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.modifications.is_empty()
    }
}

// ==========================================
// 错误类型
// ==========================================

/// 改进建议调用错误 (非致命: 调用方降级为"不改")
#[derive(Error, Debug)]
pub enum ProposerError {
    #[error("改进建议调用超时: {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("改进建议提供方不可达: {0}")]
    Transport(String),

    #[error("改进建议内容不可解析: {0}")]
    Malformed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 改进建议提供方 Trait
// ==========================================

/// 外部改进建议提供方
///
/// 输入: 当前任务 + 工序 + 员工 + 历史违规记录
/// 输出: 按任务ID组织的字段级编辑集合
///
/// # 实现说明
/// - 调用方用超时包裹本调用,实现方不必自行限时
/// - 实现方返回的编辑不会被直接信任,应用前逐条校验
#[async_trait]
pub trait ModificationProposer: Send + Sync {
    async fn propose(
        &self,
        tasks: &[ScheduledTask],
        steps: &[ProductionStep],
        employees: &[Employee],
        history: &[IterationRecord],
    ) -> Result<ScheduleProposal, ProposerError>;
}

/// 空操作建议提供方
///
/// 用于不接入外部提供方的场景 (如单元测试、基线运行)
#[derive(Debug, Clone, Default)]
pub struct NoOpProposer;

#[async_trait]
impl ModificationProposer for NoOpProposer {
    async fn propose(
        &self,
        _tasks: &[ScheduledTask],
        _steps: &[ProductionStep],
        _employees: &[Employee],
        _history: &[IterationRecord],
    ) -> Result<ScheduleProposal, ProposerError> {
        tracing::debug!("NoOpProposer: 返回空建议");
        Ok(ScheduleProposal::empty())
    }
}

// ==========================================
// 原始文本解析
// ==========================================

/// 解析远程提供方返回的原始文本
///
/// 容忍 Markdown 代码围栏 (```json ... ```),其余偏差一律视为不可解析。
/// 供远程实现方复用;解析失败应映射为空建议。
pub fn parse_proposal(raw: &str) -> Result<ScheduleProposal, ProposerError> {
    let mut text = raw.trim();

    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    let text = text.trim();

    serde_json::from_str::<ScheduleProposal>(text)
        .map_err(|e| ProposerError::Malformed(e.to_string()))
}
