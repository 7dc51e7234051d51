// ==========================================
// 车间工单排产系统 - 解说文本接口
// ==========================================
// 职责: 定义排产状态解说 trait,供日志消费
// 红线: 解说文本只进日志,绝不参与任何控制流
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;

// ==========================================
// ScheduleDigest - 迭代状态摘要
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDigest {
    pub iteration: usize,
    pub feasible: bool,
    pub score: f64,
    pub task_count: usize,
    pub violation_count: usize,
    pub locked_count: usize,
}

// ==========================================
// 解说 Trait
// ==========================================

/// 排产状态解说方
///
/// 输入状态摘要,返回自由文本。调用失败或返回空串都无害:
/// 编排器只把结果写入日志。
pub trait NarrativeReporter: Send + Sync {
    fn describe(&self, digest: &ScheduleDigest) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作解说方
#[derive(Debug, Clone, Default)]
pub struct NoOpNarrator;

impl NarrativeReporter for NoOpNarrator {
    fn describe(&self, digest: &ScheduleDigest) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(iteration = digest.iteration, "NoOpNarrator: 跳过解说生成");
        Ok(String::new())
    }
}
