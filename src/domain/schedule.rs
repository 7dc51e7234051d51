// ==========================================
// 车间工单排产系统 - 排产结果领域模型
// ==========================================
// 职责: 排产任务 (ScheduledTask) 与锁定分配 (LockedAssignment)
// 红线: 锁定分配一经加入,整个运行期间不可修改、不可移除
// ==========================================

use crate::domain::types::TimeSlot;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// ScheduledTask - 排产任务
// ==========================================
// 不变量:
// - units_start <= units_end < order.units (件号从 0 开始)
// - 可行排产内 (station_id, day, time_slot) 唯一
// - 同一工序的件号区间在任务之间不重叠
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: String,             // 任务ID (运行内稳定,供改进建议引用)
    pub station_id: String,          // 工位
    pub day: NaiveDate,              // 日期
    pub time_slot: TimeSlot,         // 班次
    pub purchase_order_id: String,   // 所属工单
    pub step_id: String,             // 所属工序
    pub activity_id: String,         // 所需工种
    pub employee_id: Option<String>, // 分配员工 (资源分配前为空)
    pub units_start: u32,            // 起始件号 (含)
    pub units_end: u32,              // 结束件号 (含)
}

impl ScheduledTask {
    /// 本任务覆盖的件数
    pub fn unit_count(&self) -> u32 {
        self.units_end - self.units_start + 1
    }

    /// 本任务覆盖的件号区间迭代器
    pub fn units(&self) -> impl Iterator<Item = u32> {
        self.units_start..=self.units_end
    }
}

// ==========================================
// LockedAssignment - 锁定分配
// ==========================================
// ScheduledTask 的不可变快照: 当任务所属工序的全部前置工序
// 已进入锁定集 (或本就没有前置) 时由编排器晋升。
// 携带件号区间,供 Sequencer 在后续迭代中视为已完成。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockedAssignment {
    pub step_id: String,
    pub station_id: String,
    pub day: NaiveDate,
    pub time_slot: TimeSlot,
    pub activity_id: String,
    pub employee_id: Option<String>,
    pub units_start: u32,
    pub units_end: u32,
}

impl LockedAssignment {
    /// 从排产任务生成锁定快照
    pub fn from_task(task: &ScheduledTask) -> Self {
        Self {
            step_id: task.step_id.clone(),
            station_id: task.station_id.clone(),
            day: task.day,
            time_slot: task.time_slot,
            activity_id: task.activity_id.clone(),
            employee_id: task.employee_id.clone(),
            units_start: task.units_start,
            units_end: task.units_end,
        }
    }

    /// 锁定区间覆盖的件号迭代器
    pub fn units(&self) -> impl Iterator<Item = u32> {
        self.units_start..=self.units_end
    }
}
