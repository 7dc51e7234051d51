// ==========================================
// 车间工单排产系统 - 配置错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 配置错误为致命错误,排产开始前立即中止
// ==========================================

use thiserror::Error;

/// 排产前置校验错误
///
/// 这些错误说明问题数据本身不完整,任何排产尝试都没有意义,
/// 因此在进入迭代循环之前直接中止整个运行。
#[derive(Error, Debug)]
pub enum ConfigurationError {
    // ===== 人员配置错误 =====
    #[error("没有可用员工")]
    NoEmployees,

    #[error("员工技能为空: employee_id={employee_id}")]
    EmployeeWithoutSkills { employee_id: String },

    #[error("工种没有合格员工: activity_id={activity_id}")]
    NoQualifiedEmployees { activity_id: String },

    // ===== 工序配置错误 =====
    #[error("工序引用了未知工种: step_id={step_id}, activity_id={activity_id}")]
    UnknownActivity { step_id: String, activity_id: String },

    #[error("工序缺失工种: step_id={step_id}")]
    MissingActivity { step_id: String },

    #[error("工序依赖图存在环: 涉及工序 {step_ids:?}")]
    DependencyCycle { step_ids: Vec<String> },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type SchedulingResult<T> = Result<T, ConfigurationError>;
