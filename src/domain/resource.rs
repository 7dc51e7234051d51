// ==========================================
// 车间工单排产系统 - 资源领域模型
// ==========================================
// 职责: 工种 (Activity)、工位 (Station)、员工 (Employee)
// ==========================================

use crate::domain::types::TimeSlot;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// Activity - 工种
// ==========================================
// 不可变参考数据: 工序要求的技能/作业类型分类
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,          // 工种ID
    pub description: String, // 工种描述
}

impl Activity {
    pub fn new(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
        }
    }
}

// ==========================================
// Station - 工位
// ==========================================
// current_activity_id 记录最近一次配置的工种,
// 排产引擎用它做换型规避 (排产运行期间由 Sequencer 独占)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: String,                          // 工位ID
    pub current_activity_id: Option<String>, // 当前配置工种 (可为空)
}

impl Station {
    pub fn new(id: &str, current_activity_id: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            current_activity_id: current_activity_id.map(|s| s.to_string()),
        }
    }
}

// ==========================================
// Employee - 员工
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,                     // 员工ID
    pub name: String,                   // 姓名
    pub skills: HashSet<String>,        // 掌握的工种 (非空)
    pub availability: HashSet<NaiveDate>, // 可出勤日期集合

    /// 上午班可用
    #[serde(default = "default_shift_available")]
    pub am_shift_available: bool,

    /// 下午班可用
    #[serde(default = "default_shift_available")]
    pub pm_shift_available: bool,

    /// 每日最多班次数
    #[serde(default = "default_max_shifts_per_day")]
    pub max_shifts_per_day: u32,
}

fn default_shift_available() -> bool {
    true
}

fn default_max_shifts_per_day() -> u32 {
    2
}

impl Employee {
    /// 创建全勤员工 (两班可用)
    pub fn new(id: &str, name: &str, skills: &[&str], availability: &[NaiveDate]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            availability: availability.iter().copied().collect(),
            am_shift_available: true,
            pm_shift_available: true,
            max_shifts_per_day: default_max_shifts_per_day(),
        }
    }

    /// 判断员工在指定日期、班次是否可用
    pub fn is_available(&self, day: NaiveDate, time_slot: TimeSlot) -> bool {
        if !self.availability.contains(&day) {
            return false;
        }
        match time_slot {
            TimeSlot::Am => self.am_shift_available,
            TimeSlot::Pm => self.pm_shift_available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    #[test]
    fn test_employee_availability_by_day() {
        let emp = Employee::new("E1", "电工一号", &["A1", "A4"], &[day(1), day(2)]);
        assert!(emp.is_available(day(1), TimeSlot::Am));
        assert!(emp.is_available(day(2), TimeSlot::Pm));
        assert!(!emp.is_available(day(3), TimeSlot::Am));
    }

    #[test]
    fn test_employee_shift_flags() {
        let mut emp = Employee::new("E2", "检验员", &["A8"], &[day(1)]);
        emp.pm_shift_available = false;
        assert!(emp.is_available(day(1), TimeSlot::Am));
        assert!(!emp.is_available(day(1), TimeSlot::Pm));
    }
}
