// ==========================================
// 车间工单排产系统 - 工序排程引擎
// ==========================================
// 职责: 逐班次贪心生成排产任务
// 输入: 工单 + 工序 + 锁定分配集合
// 输出: ScheduledTask 列表 (employee_id 留空,由资源分配引擎填充)
// 红线: 产出任务在生成时刻必须满足依赖与工位容量约束
// 红线: 锁定件号视为已完成,排程不得与锁定分配矛盾
// ==========================================

use crate::domain::{LockedAssignment, ProductionStep, PurchaseOrder, ScheduledTask, Station, TimeSlot};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, instrument};

// ==========================================
// StepSequencer - 工序排程引擎
// ==========================================
pub struct StepSequencer {
    stations: Vec<Station>,
    horizon: Vec<NaiveDate>,
    stations_per_shift: usize,
}

// 单次排程的运行状态: 跨整个排程窗口持续累积
struct SequencerState {
    // step_id -> 已排件号集合 (单调增长)
    completed_units: HashMap<String, BTreeSet<u32>>,
    // station_id -> 最近一次配置的工种 (换型规避)
    station_activity: HashMap<String, Option<String>>,
}

// 单个候选工作项: 某工序的下一段连续未排件号区间
struct WorkItem<'a> {
    order: &'a PurchaseOrder,
    step: &'a ProductionStep,
    units_start: u32,
    units_end: u32,
}

impl SequencerState {
    /// 由工位初始配置与锁定分配集合构建初始状态
    ///
    /// 锁定件号在排程窗口开始前即视为已完成,
    /// 后续迭代只会对剩余件号继续排程。
    fn seed(stations: &[Station], locked: &HashSet<LockedAssignment>) -> Self {
        let station_activity = stations
            .iter()
            .map(|s| (s.id.clone(), s.current_activity_id.clone()))
            .collect();

        let mut completed_units: HashMap<String, BTreeSet<u32>> = HashMap::new();
        for assignment in locked {
            completed_units
                .entry(assignment.step_id.clone())
                .or_default()
                .extend(assignment.units());
        }

        Self {
            completed_units,
            station_activity,
        }
    }

    /// 某工序已排件数
    fn completed_count(&self, step_id: &str) -> usize {
        self.completed_units.get(step_id).map_or(0, |set| set.len())
    }

    /// 工序是否已排满全部件数
    fn is_step_complete(&self, step: &ProductionStep, order: &PurchaseOrder) -> bool {
        self.completed_count(&step.step_id) >= order.units as usize
    }

    /// 依赖放行判定: 每个前置工序的已排件数都达到本工序的开工门槛
    fn can_start(&self, step: &ProductionStep) -> bool {
        step.depends_on
            .iter()
            .all(|dep_id| self.completed_count(dep_id) >= step.min_units_to_start as usize)
    }

    /// 计算工序的下一段连续未排件号区间 (闭区间)
    ///
    /// 区间长度不超过 units_per_station,不越过工单总件数,
    /// 也不越过下一个已排件号 (保证同工序区间永不重叠)。
    fn next_unit_range(&self, step: &ProductionStep, order: &PurchaseOrder) -> Option<(u32, u32)> {
        if order.units == 0 || step.units_per_station == 0 {
            return None;
        }

        let empty = BTreeSet::new();
        let done = self.completed_units.get(&step.step_id).unwrap_or(&empty);

        let mut start = 0u32;
        while start < order.units && done.contains(&start) {
            start += 1;
        }
        if start >= order.units {
            return None;
        }

        let cap = (start + step.units_per_station - 1).min(order.units - 1);
        let mut end = start;
        while end < cap && !done.contains(&(end + 1)) {
            end += 1;
        }

        Some((start, end))
    }

    /// 将一段件号区间记入已排集合
    fn mark_scheduled(&mut self, step_id: &str, units_start: u32, units_end: u32) {
        self.completed_units
            .entry(step_id.to_string())
            .or_default()
            .extend(units_start..=units_end);
    }
}

impl StepSequencer {
    /// 构造排程引擎
    ///
    /// # 参数
    /// - `stations`: 工位列表 (含初始工种配置)
    /// - `horizon`: 排程窗口内的日期列表 (按时间顺序)
    /// - `stations_per_shift`: 每班次可并行使用的工位数上限
    pub fn new(stations: Vec<Station>, horizon: Vec<NaiveDate>, stations_per_shift: usize) -> Self {
        Self {
            stations,
            horizon,
            stations_per_shift,
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 逐班次贪心生成排产任务
    ///
    /// 每个班次:
    /// 1) 计算可排工作项 (未排满 + 依赖放行,取下一段连续件号区间)
    /// 2) 反复选取评分最高的工作项落位,直到工位用尽或无工作项;
    ///    评分并列时保持原始顺序 (稳定选取)
    /// 3) 落位后同一工序若还有剩余件号,重新进入候选
    ///
    /// 状态跨整个排程窗口持续累积,是线性贪心而非全局最优。
    #[instrument(skip(self, orders, steps, locked), fields(
        orders_count = orders.len(),
        steps_count = steps.len(),
        locked_count = locked.len(),
        horizon_days = self.horizon.len()
    ))]
    pub fn build_schedule(
        &self,
        orders: &[PurchaseOrder],
        steps: &[ProductionStep],
        locked: &HashSet<LockedAssignment>,
    ) -> Vec<ScheduledTask> {
        let mut state = SequencerState::seed(&self.stations, locked);
        let mut tasks: Vec<ScheduledTask> = Vec::new();
        let mut task_seq: usize = 0;

        for &day in &self.horizon {
            for time_slot in TimeSlot::ALL {
                let mut used_stations: HashSet<String> = HashSet::new();

                // 1. 计算本班次的可排工作项
                let mut available = self.collect_available_work(orders, steps, &state);

                // 2. 贪心填充
                while used_stations.len() < self.stations_per_shift && !available.is_empty() {
                    let best_idx = self.pick_best_item(&available, &state);
                    let item = available.remove(best_idx);

                    let station_id = match self.pick_station(
                        &item.step.activity_id,
                        &state,
                        &used_stations,
                    ) {
                        Some(id) => id,
                        // 没有空闲工位,本班次结束
                        None => break,
                    };

                    task_seq += 1;
                    tasks.push(ScheduledTask {
                        task_id: format!("TASK-{:04}", task_seq),
                        station_id: station_id.clone(),
                        day,
                        time_slot,
                        purchase_order_id: item.order.id.clone(),
                        step_id: item.step.step_id.clone(),
                        activity_id: item.step.activity_id.clone(),
                        employee_id: None,
                        units_start: item.units_start,
                        units_end: item.units_end,
                    });

                    used_stations.insert(station_id.clone());
                    state
                        .station_activity
                        .insert(station_id, Some(item.step.activity_id.clone()));
                    state.mark_scheduled(&item.step.step_id, item.units_start, item.units_end);

                    // 同一工序若还有剩余件号,重新进入候选队尾
                    if let Some((units_start, units_end)) =
                        state.next_unit_range(item.step, item.order)
                    {
                        available.push(WorkItem {
                            order: item.order,
                            step: item.step,
                            units_start,
                            units_end,
                        });
                    }
                }

                debug!(
                    day = %day,
                    time_slot = %time_slot,
                    stations_used = used_stations.len(),
                    "班次排程完成"
                );
            }
        }

        tasks
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 计算可排工作项: 未排满且依赖放行的 (工单, 工序)
    fn collect_available_work<'a>(
        &self,
        orders: &'a [PurchaseOrder],
        steps: &'a [ProductionStep],
        state: &SequencerState,
    ) -> Vec<WorkItem<'a>> {
        let mut available = Vec::new();

        for order in orders {
            for step in steps.iter().filter(|s| s.purchase_order_id == order.id) {
                if state.is_step_complete(step, order) {
                    continue;
                }
                if !state.can_start(step) {
                    continue;
                }
                if let Some((units_start, units_end)) = state.next_unit_range(step, order) {
                    available.push(WorkItem {
                        order,
                        step,
                        units_start,
                        units_end,
                    });
                }
            }
        }

        available
    }

    /// 工作项评分
    ///
    /// 组成 (各项上限 20,优先级项 0-40):
    /// - 0.4 * 有效优先级
    /// - 完成度: 越不完整分越高
    /// - 依赖就绪: 全部前置达到门槛记 20 分
    /// - 加工效率: 单工位吞吐 / 单件天数
    fn score_item(&self, item: &WorkItem<'_>, state: &SequencerState) -> f64 {
        let priority_score = item.order.effective_priority * 0.4;

        let units_done = state.completed_count(&item.step.step_id) as f64;
        let total_units = item.order.units.max(1) as f64;
        let progress_score = 20.0 * (1.0 - units_done / total_units);

        let dep_score = if state.can_start(item.step) { 20.0 } else { 0.0 };

        let efficiency = if item.step.duration_days > 0.0 {
            (item.step.units_per_station as f64 / item.step.duration_days) * 10.0
        } else {
            20.0
        };
        let efficiency_score = efficiency.min(20.0);

        priority_score + progress_score + dep_score + efficiency_score
    }

    /// 稳定选取评分最高的工作项 (并列取先出现者)
    fn pick_best_item(&self, available: &[WorkItem<'_>], state: &SequencerState) -> usize {
        let mut best_idx = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (idx, item) in available.iter().enumerate() {
            let score = self.score_item(item, state);
            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
        }
        best_idx
    }

    /// 选取落位工位
    ///
    /// 偏好顺序:
    /// 1) 本班次未用、已配置为目标工种的工位 (免换型)
    /// 2) 本班次未用、尚无工种配置的工位
    /// 3) 任意本班次未用的工位
    fn pick_station(
        &self,
        activity_id: &str,
        state: &SequencerState,
        used_stations: &HashSet<String>,
    ) -> Option<String> {
        for station in &self.stations {
            if used_stations.contains(&station.id) {
                continue;
            }
            let configured = state
                .station_activity
                .get(&station.id)
                .and_then(|a| a.as_deref());
            if configured == Some(activity_id) {
                return Some(station.id.clone());
            }
        }

        for station in &self.stations {
            if used_stations.contains(&station.id) {
                continue;
            }
            if matches!(state.station_activity.get(&station.id), Some(None)) {
                return Some(station.id.clone());
            }
        }

        self.stations
            .iter()
            .find(|s| !used_stations.contains(&s.id))
            .map(|s| s.id.clone())
    }
}

// ==========================================
// 测试模块
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================
    // 测试辅助函数
    // ==========================================

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    fn horizon(days: u32) -> Vec<NaiveDate> {
        (1..=days).map(day).collect()
    }

    fn create_test_order(id: &str, units: u32, priority: f64) -> PurchaseOrder {
        let mut po = PurchaseOrder::new(id, day(20), 50, 10_000.0, units);
        po.effective_priority = priority;
        po
    }

    fn create_test_step(
        step_id: &str,
        po_id: &str,
        activity_id: &str,
        units_per_station: u32,
        min_units_to_start: u32,
        depends_on: &[&str],
    ) -> ProductionStep {
        ProductionStep {
            step_id: step_id.to_string(),
            purchase_order_id: po_id.to_string(),
            activity_id: activity_id.to_string(),
            step_order: 1,
            duration_days: 0.1,
            setup_time_days: 0.0,
            teardown_time_days: 0.0,
            units_per_station,
            min_units_to_start,
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn create_test_stations(count: usize) -> Vec<Station> {
        (1..=count).map(|i| Station::new(&format!("S{}", i), None)).collect()
    }

    #[test]
    fn test_single_step_lands_day1_am() {
        // 单工位、单工序、单件: 应恰好在第 1 天上午班产出一个任务
        let sequencer = StepSequencer::new(create_test_stations(1), horizon(2), 1);
        let orders = vec![create_test_order("PO-1", 1, 50.0)];
        let steps = vec![create_test_step("ST-1", "PO-1", "A1", 1, 0, &[])];

        let tasks = sequencer.build_schedule(&orders, &steps, &HashSet::new());

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].day, day(1));
        assert_eq!(tasks[0].time_slot, TimeSlot::Am);
        assert_eq!(tasks[0].units_start, 0);
        assert_eq!(tasks[0].units_end, 0);
        assert!(tasks[0].employee_id.is_none());
    }

    #[test]
    fn test_unit_range_capped_by_station_capacity_and_order_total() {
        // 7 件、单工位单班次最多 5 件: 第一段 0-4,第二段 5-6
        let sequencer = StepSequencer::new(create_test_stations(1), horizon(1), 1);
        let orders = vec![create_test_order("PO-1", 7, 50.0)];
        let steps = vec![create_test_step("ST-1", "PO-1", "A1", 5, 0, &[])];

        let tasks = sequencer.build_schedule(&orders, &steps, &HashSet::new());

        assert_eq!(tasks.len(), 2);
        assert_eq!((tasks[0].units_start, tasks[0].units_end), (0, 4));
        assert_eq!(tasks[0].time_slot, TimeSlot::Am);
        assert_eq!((tasks[1].units_start, tasks[1].units_end), (5, 6));
        assert_eq!(tasks[1].time_slot, TimeSlot::Pm);
    }

    #[test]
    fn test_dependency_threshold_gates_admission() {
        // ST-2 依赖 ST-1,门槛 5 件: 上午 ST-1 排 0-4,下午 ST-2 放行
        let sequencer = StepSequencer::new(create_test_stations(1), horizon(1), 1);
        let orders = vec![create_test_order("PO-1", 10, 50.0)];
        let steps = vec![
            create_test_step("ST-1", "PO-1", "A1", 5, 0, &[]),
            create_test_step("ST-2", "PO-1", "A2", 5, 5, &["ST-1"]),
        ];

        let tasks = sequencer.build_schedule(&orders, &steps, &HashSet::new());

        assert_eq!(tasks[0].step_id, "ST-1");
        assert_eq!(tasks[0].time_slot, TimeSlot::Am);
        // 下午班: ST-2 完成度评分更高,优先落位
        assert_eq!(tasks[1].step_id, "ST-2");
        assert_eq!(tasks[1].time_slot, TimeSlot::Pm);
        assert_eq!((tasks[1].units_start, tasks[1].units_end), (0, 4));
    }

    #[test]
    fn test_unreachable_threshold_never_schedules_dependent() {
        // 门槛 5 件但工单只有 3 件: ST-2 永远不放行
        let sequencer = StepSequencer::new(create_test_stations(2), horizon(3), 2);
        let orders = vec![create_test_order("PO-1", 3, 50.0)];
        let steps = vec![
            create_test_step("ST-1", "PO-1", "A1", 3, 0, &[]),
            create_test_step("ST-2", "PO-1", "A2", 3, 5, &["ST-1"]),
        ];

        let tasks = sequencer.build_schedule(&orders, &steps, &HashSet::new());

        assert!(tasks.iter().any(|t| t.step_id == "ST-1"));
        assert!(tasks.iter().all(|t| t.step_id != "ST-2"));
    }

    #[test]
    fn test_station_prefers_matching_activity() {
        // S1 配置为 A2、S2 配置为 A1: A1 工序应落在 S2,免换型
        let stations = vec![Station::new("S1", Some("A2")), Station::new("S2", Some("A1"))];
        let sequencer = StepSequencer::new(stations, horizon(1), 2);
        let orders = vec![create_test_order("PO-1", 1, 50.0)];
        let steps = vec![create_test_step("ST-1", "PO-1", "A1", 1, 0, &[])];

        let tasks = sequencer.build_schedule(&orders, &steps, &HashSet::new());

        assert_eq!(tasks[0].station_id, "S2");
    }

    #[test]
    fn test_station_prefers_unconfigured_over_mismatched() {
        // S1 配置为 A2、S2 无配置: A1 工序应落在 S2 而不是挤掉 S1 的配置
        let stations = vec![Station::new("S1", Some("A2")), Station::new("S2", None)];
        let sequencer = StepSequencer::new(stations, horizon(1), 2);
        let orders = vec![create_test_order("PO-1", 1, 50.0)];
        let steps = vec![create_test_step("ST-1", "PO-1", "A1", 1, 0, &[])];

        let tasks = sequencer.build_schedule(&orders, &steps, &HashSet::new());

        assert_eq!(tasks[0].station_id, "S2");
    }

    #[test]
    fn test_shift_ends_when_stations_exhausted() {
        // 班次容量 12 但只有 2 个物理工位: 每班次最多 2 个任务,不得死循环
        let sequencer = StepSequencer::new(create_test_stations(2), horizon(1), 12);
        let orders = vec![create_test_order("PO-1", 50, 50.0)];
        let steps = vec![create_test_step("ST-1", "PO-1", "A1", 1, 0, &[])];

        let tasks = sequencer.build_schedule(&orders, &steps, &HashSet::new());

        for slot in TimeSlot::ALL {
            let per_shift = tasks.iter().filter(|t| t.time_slot == slot).count();
            assert!(per_shift <= 2, "班次 {} 任务数 {} 超出物理工位数", slot, per_shift);
        }
    }

    #[test]
    fn test_locked_units_are_pre_completed() {
        // 锁定分配覆盖 ST-1 全部 5 件: 本轮不再为 ST-1 排程,ST-2 直接放行
        let mut locked = HashSet::new();
        locked.insert(LockedAssignment {
            step_id: "ST-1".to_string(),
            station_id: "S1".to_string(),
            day: day(1),
            time_slot: TimeSlot::Am,
            activity_id: "A1".to_string(),
            employee_id: Some("E1".to_string()),
            units_start: 0,
            units_end: 4,
        });

        let sequencer = StepSequencer::new(create_test_stations(1), horizon(1), 1);
        let orders = vec![create_test_order("PO-1", 5, 50.0)];
        let steps = vec![
            create_test_step("ST-1", "PO-1", "A1", 5, 0, &[]),
            create_test_step("ST-2", "PO-1", "A2", 5, 5, &["ST-1"]),
        ];

        let tasks = sequencer.build_schedule(&orders, &steps, &locked);

        assert!(tasks.iter().all(|t| t.step_id != "ST-1"));
        assert_eq!(tasks[0].step_id, "ST-2");
        assert_eq!(tasks[0].time_slot, TimeSlot::Am);
    }

    #[test]
    fn test_no_overlapping_unit_ranges_per_step() {
        // 多工单多工序混排: 同工序件号区间互不重叠,且不越界
        let sequencer = StepSequencer::new(create_test_stations(4), horizon(5), 4);
        let orders = vec![
            create_test_order("PO-1", 12, 80.0),
            create_test_order("PO-2", 9, 60.0),
        ];
        let steps = vec![
            create_test_step("ST-11", "PO-1", "A1", 4, 0, &[]),
            create_test_step("ST-12", "PO-1", "A2", 4, 4, &["ST-11"]),
            create_test_step("ST-21", "PO-2", "A1", 3, 0, &[]),
            create_test_step("ST-22", "PO-2", "A3", 3, 3, &["ST-21"]),
        ];

        let tasks = sequencer.build_schedule(&orders, &steps, &HashSet::new());

        let units_by_order: HashMap<&str, u32> =
            orders.iter().map(|po| (po.id.as_str(), po.units)).collect();
        let mut seen: HashMap<&str, BTreeSet<u32>> = HashMap::new();
        for task in &tasks {
            assert!(task.units_start <= task.units_end);
            assert!(task.units_end < units_by_order[task.purchase_order_id.as_str()]);
            let step_units = seen.entry(task.step_id.as_str()).or_default();
            for unit in task.units() {
                assert!(step_units.insert(unit), "工序 {} 件号 {} 重复排程", task.step_id, unit);
            }
        }
    }

    #[test]
    fn test_tie_break_keeps_input_order() {
        // 两个评分完全相同的工序: 先出现的工单先落位
        let sequencer = StepSequencer::new(create_test_stations(2), horizon(1), 2);
        let orders = vec![
            create_test_order("PO-1", 1, 50.0),
            create_test_order("PO-2", 1, 50.0),
        ];
        let steps = vec![
            create_test_step("ST-1", "PO-1", "A1", 1, 0, &[]),
            create_test_step("ST-2", "PO-2", "A1", 1, 0, &[]),
        ];

        let tasks = sequencer.build_schedule(&orders, &steps, &HashSet::new());

        assert_eq!(tasks[0].purchase_order_id, "PO-1");
        assert_eq!(tasks[1].purchase_order_id, "PO-2");
    }

    #[test]
    fn test_dependency_units_scheduled_before_dependent_shift() {
        // 时序性质: 依赖工序的件号必须在被依赖方达到门槛之后的班次才出现
        let sequencer = StepSequencer::new(create_test_stations(3), horizon(4), 3);
        let orders = vec![create_test_order("PO-1", 9, 70.0)];
        let steps = vec![
            create_test_step("ST-1", "PO-1", "A1", 3, 0, &[]),
            create_test_step("ST-2", "PO-1", "A2", 3, 6, &["ST-1"]),
        ];

        let tasks = sequencer.build_schedule(&orders, &steps, &HashSet::new());

        let first_dependent = tasks
            .iter()
            .find(|t| t.step_id == "ST-2")
            .expect("ST-2 应当被排入");
        let dep_units_before: usize = tasks
            .iter()
            .filter(|t| {
                t.step_id == "ST-1"
                    && (t.day, t.time_slot) < (first_dependent.day, first_dependent.time_slot)
            })
            .map(|t| t.unit_count() as usize)
            .sum();
        assert!(dep_units_before >= 6);
    }
}
