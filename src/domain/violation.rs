// ==========================================
// 车间工单排产系统 - 约束违规领域模型
// ==========================================
// 职责: 按类别建模的违规记录 + 迭代历史
// 红线: 违规是数据不是异常,驱动迭代重试与锁定决策
// ==========================================

use crate::domain::types::{Severity, TimeSlot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ConstraintViolation - 约束违规
// ==========================================
// 每个变体只携带与该类违规相关的字段,便于穷尽匹配
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintViolation {
    /// 员工在不可出勤日期被排班
    EmployeeUnavailable { employee_id: String, day: NaiveDate },

    /// 员工不具备任务要求的工种技能
    SkillMismatch {
        employee_id: String,
        step_id: String,
        activity_id: String,
    },

    /// 员工单日跨越过多班次
    WorkerOverload {
        employee_id: String,
        day: NaiveDate,
        shifts: Vec<TimeSlot>,
    },

    /// 同一工位同一班次被排入多个任务
    StationConflict { station_id: String, day: NaiveDate },

    /// 前置工序没有任何排产任务
    MissingDependency {
        step_id: String,
        dependency_id: String,
    },

    /// 前置工序已排件数不足以放行本工序
    InsufficientUnits {
        step_id: String,
        dependency_id: String,
        units_available: u32,
        units_needed: u32,
    },
}

impl ConstraintViolation {
    /// 违规严重等级
    pub fn severity(&self) -> Severity {
        match self {
            ConstraintViolation::WorkerOverload { .. } => Severity::Medium,
            ConstraintViolation::EmployeeUnavailable { .. }
            | ConstraintViolation::SkillMismatch { .. }
            | ConstraintViolation::StationConflict { .. }
            | ConstraintViolation::MissingDependency { .. }
            | ConstraintViolation::InsufficientUnits { .. } => Severity::High,
        }
    }

    /// 类别标识
    pub fn kind(&self) -> &'static str {
        match self {
            ConstraintViolation::EmployeeUnavailable { .. } => "employee_unavailable",
            ConstraintViolation::SkillMismatch { .. } => "skill_mismatch",
            ConstraintViolation::WorkerOverload { .. } => "worker_overload",
            ConstraintViolation::StationConflict { .. } => "station_conflict",
            ConstraintViolation::MissingDependency { .. } => "missing_dependency",
            ConstraintViolation::InsufficientUnits { .. } => "insufficient_units",
        }
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintViolation::EmployeeUnavailable { employee_id, day } => {
                write!(f, "员工 {} 在 {} 不可出勤", employee_id, day)
            }
            ConstraintViolation::SkillMismatch {
                employee_id,
                step_id,
                activity_id,
            } => write!(
                f,
                "员工 {} 不具备工序 {} 要求的工种 {}",
                employee_id, step_id, activity_id
            ),
            ConstraintViolation::WorkerOverload {
                employee_id,
                day,
                shifts,
            } => write!(
                f,
                "员工 {} 在 {} 跨越 {} 个班次",
                employee_id,
                day,
                shifts.len()
            ),
            ConstraintViolation::StationConflict { station_id, day } => {
                write!(f, "工位 {} 在 {} 单班次被重复占用", station_id, day)
            }
            ConstraintViolation::MissingDependency {
                step_id,
                dependency_id,
            } => write!(f, "工序 {} 的前置 {} 没有任何排产任务", step_id, dependency_id),
            ConstraintViolation::InsufficientUnits {
                step_id,
                dependency_id,
                units_available,
                units_needed,
            } => write!(
                f,
                "工序 {} 的前置 {} 已排 {} 件,不足放行门槛 {} 件",
                step_id, dependency_id, units_available, units_needed
            ),
        }
    }
}

// ==========================================
// IterationRecord - 迭代违规历史
// ==========================================
// 只作为外部改进建议方与日志的上下文,不驱动任何确定性分支
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub violations: Vec<ConstraintViolation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_per_kind() {
        let v = ConstraintViolation::WorkerOverload {
            employee_id: "E1".to_string(),
            day: NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(),
            shifts: vec![TimeSlot::Am, TimeSlot::Pm],
        };
        assert_eq!(v.severity(), Severity::Medium);

        let v = ConstraintViolation::StationConflict {
            station_id: "S1".to_string(),
            day: NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(),
        };
        assert_eq!(v.severity(), Severity::High);
    }

    #[test]
    fn test_serialized_tag_matches_kind() {
        let v = ConstraintViolation::MissingDependency {
            step_id: "ST-2".to_string(),
            dependency_id: "ST-1".to_string(),
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["type"], v.kind());
    }
}
