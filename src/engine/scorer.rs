// ==========================================
// 车间工单排产系统 - 排产评分引擎
// ==========================================
// 职责: 多因子排产质量评分
// 输入: 排产任务列表
// 输出: 非负分值 (越高越好)
// 约定: 各实体的缺口惩罚项先在 0 处截断再求和
// ==========================================

use crate::domain::{ScheduledTask, TimeSlot};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

// ==========================================
// ScheduleScorer - 排产评分引擎
// ==========================================
pub struct ScheduleScorer {
    stations_per_shift: usize,
    horizon_days: usize,
}

impl ScheduleScorer {
    pub fn new(stations_per_shift: usize, horizon_days: usize) -> Self {
        Self {
            stations_per_shift,
            horizon_days,
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 排产质量评分
    ///
    /// 组成:
    /// - 基础分: 2000 * 平均班次利用率
    /// - 加分: 双班工位日 *10,任务数 *5
    /// - 罚分: 单日任务缺口 *20,班次失衡 *100,
    ///         工位任务缺口 *15,工位换型次数 *10
    ///
    /// 空排产得 0 分,最终分值在 0 处截断。
    pub fn score(&self, tasks: &[ScheduledTask]) -> f64 {
        if tasks.is_empty() {
            return 0.0;
        }

        let mut am_count = 0usize;
        let mut pm_count = 0usize;
        let mut station_shifts: HashMap<(String, NaiveDate), HashSet<TimeSlot>> = HashMap::new();
        let mut day_usage: HashMap<NaiveDate, usize> = HashMap::new();
        let mut station_usage: HashMap<String, usize> = HashMap::new();

        for task in tasks {
            match task.time_slot {
                TimeSlot::Am => am_count += 1,
                TimeSlot::Pm => pm_count += 1,
            }
            station_shifts
                .entry((task.station_id.clone(), task.day))
                .or_default()
                .insert(task.time_slot);
            *day_usage.entry(task.day).or_insert(0) += 1;
            *station_usage.entry(task.station_id.clone()).or_insert(0) += 1;
        }

        // 每班次总槽位 = 工位数 * 天数
        let slots_per_shift = (self.stations_per_shift * self.horizon_days).max(1) as f64;
        let am_utilization = am_count as f64 / slots_per_shift;
        let pm_utilization = pm_count as f64 / slots_per_shift;

        // 加分项
        let full_day_bonus = station_shifts
            .values()
            .filter(|shifts| shifts.len() == 2)
            .count() as f64
            * 10.0;
        let task_count_bonus = tasks.len() as f64 * 5.0;

        // 罚分项: 各实体缺口先截断再求和
        let daily_target = (self.stations_per_shift * 2) as f64;
        let daily_penalty: f64 = day_usage
            .values()
            .map(|&count| (daily_target - count as f64).max(0.0) * 20.0)
            .sum();

        let shift_imbalance_penalty = (am_utilization - pm_utilization).abs() * 100.0;

        let station_target = (self.horizon_days * 2) as f64;
        let station_underuse_penalty: f64 = station_usage
            .values()
            .map(|&count| (station_target - count as f64).max(0.0) * 15.0)
            .sum();

        let activity_change_penalty = self.count_activity_changes(tasks) as f64 * 10.0;

        let score = (am_utilization + pm_utilization) / 2.0 * 2000.0
            + full_day_bonus
            + task_count_bonus
            - daily_penalty
            - shift_imbalance_penalty
            - station_underuse_penalty
            - activity_change_penalty;

        score.max(0.0)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 统计全部工位的换型次数 (按时间顺序,工种变化即记一次)
    fn count_activity_changes(&self, tasks: &[ScheduledTask]) -> usize {
        let mut ordered: Vec<&ScheduledTask> = tasks.iter().collect();
        ordered.sort_by(|a, b| (a.day, a.time_slot).cmp(&(b.day, b.time_slot)));

        let mut current_activity: HashMap<&str, &str> = HashMap::new();
        let mut changes = 0usize;
        for task in ordered {
            match current_activity.get(task.station_id.as_str()) {
                Some(prev) if *prev != task.activity_id.as_str() => changes += 1,
                _ => {}
            }
            current_activity.insert(task.station_id.as_str(), task.activity_id.as_str());
        }
        changes
    }
}
