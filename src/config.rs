// ==========================================
// 车间工单排产系统 - 排产配置
// ==========================================
// 职责: 排产引擎的全局参数
// 说明: 每日固定两个班次 (AM/PM),不作为配置项
// ==========================================

use serde::{Deserialize, Serialize};

/// 排产配置
///
/// 所有字段都带默认值,可以从 JSON 部分覆盖。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 每班次可并行使用的工位数
    #[serde(default = "default_stations_per_shift")]
    pub stations_per_shift: usize,

    /// 员工每日最多班次数
    #[serde(default = "default_max_shifts_per_day")]
    pub max_shifts_per_day: u32,

    /// 排产循环最大迭代次数
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// 可行性判定允许的中等违规数量上限
    #[serde(default = "default_medium_violation_tolerance")]
    pub medium_violation_tolerance: usize,

    /// 外部改进建议调用超时（毫秒）
    #[serde(default = "default_proposer_timeout_ms")]
    pub proposer_timeout_ms: u64,
}

fn default_stations_per_shift() -> usize {
    12
}

fn default_max_shifts_per_day() -> u32 {
    2
}

fn default_max_iterations() -> usize {
    3
}

fn default_medium_violation_tolerance() -> usize {
    2
}

fn default_proposer_timeout_ms() -> u64 {
    30_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            stations_per_shift: default_stations_per_shift(),
            max_shifts_per_day: default_max_shifts_per_day(),
            max_iterations: default_max_iterations(),
            medium_violation_tolerance: default_medium_violation_tolerance(),
            proposer_timeout_ms: default_proposer_timeout_ms(),
        }
    }
}
