// ==========================================
// 排程-分配-校验 引擎间集成测试
// ==========================================
// 职责: 验证多个引擎协作时的数据流与不变量
// 场景: 多工单多工艺流在多日窗口内的排程属性
// ==========================================

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use workshop_aps::domain::{
    Employee, ProductionStep, PurchaseOrder, ScheduledTask, Station, TimeSlot,
};
use workshop_aps::engine::{ConstraintValidator, ResourceAssigner, ScheduleScorer, StepSequencer};

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
        duration_days: 0.2,
        setup_time_days: 0.1,
        teardown_time_days: 0.1,
        units_per_station,
        min_units_to_start,
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
    }
}

fn create_test_stations(count: usize) -> Vec<Station> {
    (1..=count)
        .map(|i| Station::new(&format!("S{}", i), None))
        .collect()
}

fn create_test_employees(days: u32) -> Vec<Employee> {
    let dates: Vec<NaiveDate> = (1..=days).map(day).collect();
    vec![
        Employee::new("E1", "装配工一", &["A1", "A2"], &dates),
        Employee::new("E2", "装配工二", &["A1", "A3"], &dates),
        Employee::new("E3", "检验员", &["A2", "A3"], &dates),
    ]
}

// 双工单、三道工艺的标准场景
fn standard_problem() -> (Vec<PurchaseOrder>, Vec<ProductionStep>) {
    let orders = vec![
        create_test_order("PO-1", 10, 85.0),
        create_test_order("PO-2", 8, 55.0),
    ];
    let steps = vec![
        create_test_step("ST-11", "PO-1", "A1", 4, 0, &[]),
        create_test_step("ST-12", "PO-1", "A2", 4, 4, &["ST-11"]),
        create_test_step("ST-13", "PO-1", "A3", 5, 4, &["ST-12"]),
        create_test_step("ST-21", "PO-2", "A1", 4, 0, &[]),
        create_test_step("ST-22", "PO-2", "A3", 4, 3, &["ST-21"]),
    ];
    (orders, steps)
}

fn build_schedule(days: u32, stations: usize) -> (Vec<ScheduledTask>, Vec<ProductionStep>) {
    let (orders, steps) = standard_problem();
    let sequencer = StepSequencer::new(create_test_stations(stations), horizon(days), stations);
    let tasks = sequencer.build_schedule(&orders, &steps, &HashSet::new());
    (tasks, steps)
}

// ==========================================
// 属性测试
// ==========================================

#[test]
fn test_unit_ranges_within_order_bounds() {
    // 每个任务: 0 <= units_start <= units_end < order.units
    let (tasks, _) = build_schedule(6, 3);
    let (orders, _) = standard_problem();
    let units_by_order: HashMap<&str, u32> =
        orders.iter().map(|po| (po.id.as_str(), po.units)).collect();

    assert!(!tasks.is_empty());
    for task in &tasks {
        assert!(task.units_start <= task.units_end);
        assert!(task.units_end < units_by_order[task.purchase_order_id.as_str()]);
    }
}

#[test]
fn test_no_station_slot_double_booking() {
    // 同一 (工位, 日期, 班次) 不得出现两个任务
    let (tasks, _) = build_schedule(6, 3);

    let mut seen: HashSet<(&str, NaiveDate, TimeSlot)> = HashSet::new();
    for task in &tasks {
        assert!(
            seen.insert((task.station_id.as_str(), task.day, task.time_slot)),
            "工位 {} 在 {} {} 被重复占用",
            task.station_id,
            task.day,
            task.time_slot
        );
    }
}

#[test]
fn test_step_progress_is_monotonic_over_shifts() {
    // 按班次顺序回放: 每道工序的累计已排件数单调不减
    let (tasks, _) = build_schedule(6, 3);

    let mut ordered = tasks.clone();
    ordered.sort_by(|a, b| (a.day, a.time_slot).cmp(&(b.day, b.time_slot)));

    let mut progress: HashMap<&str, HashSet<u32>> = HashMap::new();
    let mut last_len: HashMap<&str, usize> = HashMap::new();
    for task in &ordered {
        let units = progress.entry(task.step_id.as_str()).or_default();
        units.extend(task.units());
        let prev = last_len.insert(task.step_id.as_str(), units.len());
        if let Some(prev) = prev {
            assert!(units.len() >= prev);
        }
    }
}

#[test]
fn test_dependency_threshold_respected_chronologically() {
    // 对依赖 (S 依赖 D, 门槛 k): S 的任何件在班次 T 排入时,
    // D 在 T 之前班次已排件数必须 >= k
    let (tasks, steps) = build_schedule(6, 3);

    let dep_thresholds: Vec<(&str, &str, u32)> = steps
        .iter()
        .flat_map(|s| {
            s.depends_on
                .iter()
                .map(move |d| (s.step_id.as_str(), d.as_str(), s.min_units_to_start))
        })
        .collect();

    for (step_id, dep_id, threshold) in dep_thresholds {
        for task in tasks.iter().filter(|t| t.step_id == step_id) {
            let dep_units: HashSet<u32> = tasks
                .iter()
                .filter(|t| {
                    t.step_id == dep_id && (t.day, t.time_slot) < (task.day, task.time_slot)
                })
                .flat_map(|t| t.units())
                .collect();
            assert!(
                dep_units.len() >= threshold as usize,
                "工序 {} 在 {} {} 排入时前置 {} 仅完成 {} 件 (需 {})",
                step_id,
                task.day,
                task.time_slot,
                dep_id,
                dep_units.len(),
                threshold
            );
        }
    }
}

#[test]
fn test_assigned_schedule_passes_validation() {
    // 排程 -> 分配 -> 校验 全链路: 产出可行排产
    let (mut tasks, steps) = build_schedule(6, 3);
    let employees = create_test_employees(6);

    let assigner = ResourceAssigner::new(employees.clone());
    assigner.assign_resources(&mut tasks, &steps).unwrap();
    assert!(tasks.iter().all(|t| t.employee_id.is_some()));

    let validator = ConstraintValidator::default();
    let report = validator.check_feasibility(&tasks, &steps, &employees);
    assert!(report.feasible, "违规: {:?}", report.violations);
}

#[test]
fn test_assignments_respect_skills() {
    let (mut tasks, steps) = build_schedule(6, 3);
    let employees = create_test_employees(6);

    let assigner = ResourceAssigner::new(employees.clone());
    assigner.assign_resources(&mut tasks, &steps).unwrap();

    let skills: HashMap<&str, &HashSet<String>> =
        employees.iter().map(|e| (e.id.as_str(), &e.skills)).collect();
    for task in &tasks {
        let employee_id = task.employee_id.as_deref().unwrap();
        assert!(
            skills[employee_id].contains(&task.activity_id),
            "员工 {} 被分配了不具备的工种 {}",
            employee_id,
            task.activity_id
        );
    }
}

#[test]
fn test_longer_horizon_never_scores_worse_for_same_tasks() {
    // 评分引擎对同一任务集在更短窗口下不应得到更低的利用率分母
    let (tasks, _) = build_schedule(4, 3);
    let short = ScheduleScorer::new(3, 4).score(&tasks);
    let long = ScheduleScorer::new(3, 8).score(&tasks);

    // 更长窗口意味着更低利用率,分值不应更高
    assert!(long <= short);
}
