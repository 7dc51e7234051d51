// ==========================================
// 车间工单排产系统 - 演示主入口
// ==========================================
// 职责: 构造示例问题数据,驱动排产循环,打印结果报告
// 说明: 示例数据与报告打印属于外部协作者,不属于核心引擎
// ==========================================

use chrono::{Duration, Local, NaiveDate};
use std::collections::BTreeMap;
use workshop_aps::domain::{
    Activity, Employee, ProductionStep, PurchaseOrder, ScheduledTask, Station, TimeSlot,
};
use workshop_aps::engine::SchedulingOrchestrator;
use workshop_aps::logging;

#[tokio::main]
async fn main() {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", workshop_aps::APP_NAME, workshop_aps::VERSION);
    tracing::info!("==================================================");

    let today = Local::now().date_naive();
    let horizon: Vec<NaiveDate> = (0..10).map(|i| today + Duration::days(i)).collect();

    let activities = create_activities();
    let stations = create_stations();
    let employees = create_employees(&horizon);
    let mut orders = create_purchase_orders(today);
    let steps = create_production_steps();

    tracing::info!(
        activities = activities.len(),
        stations = stations.len(),
        employees = employees.len(),
        orders = orders.len(),
        steps = steps.len(),
        horizon_days = horizon.len(),
        "示例问题数据已就绪"
    );

    let orchestrator = SchedulingOrchestrator::with_defaults(
        activities,
        stations,
        employees.clone(),
        horizon,
    );

    let outcome = match orchestrator.run(&mut orders, &steps, today).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "排产配置错误,运行中止");
            std::process::exit(1);
        }
    };

    tracing::info!(
        run_id = %outcome.run_id,
        feasible = outcome.feasible,
        score = outcome.score,
        tasks = outcome.tasks.len(),
        locked = outcome.locked.len(),
        "排产完成"
    );

    print_schedule_report(&outcome.tasks, &employees, &orders);
    println!(
        "\n结论: {} (评分 {:.1}, 任务 {} 项, 锁定 {} 项)",
        if outcome.feasible { "可行" } else { "不可行" },
        outcome.score,
        outcome.tasks.len(),
        outcome.locked.len()
    );
}

// ==========================================
// 示例问题数据
// ==========================================

/// 固定的八种工种
fn create_activities() -> Vec<Activity> {
    vec![
        Activity::new("A1", "面板装配"),
        Activity::new("A2", "电路板预处理"),
        Activity::new("A3", "壳体装配"),
        Activity::new("A4", "布线"),
        Activity::new("A5", "测试"),
        Activity::new("A6", "包装"),
        Activity::new("A7", "PCB 装配"),
        Activity::new("A8", "质量检验"),
    ]
}

/// 12 个工位,按工种预配置
fn create_stations() -> Vec<Station> {
    vec![
        Station::new("S1", Some("A1")),
        Station::new("S2", Some("A1")),
        Station::new("S3", Some("A2")),
        Station::new("S4", Some("A2")),
        Station::new("S5", Some("A3")),
        Station::new("S6", Some("A3")),
        Station::new("S7", Some("A4")),
        Station::new("S8", Some("A4")),
        Station::new("S9", Some("A5")),
        Station::new("S10", Some("A5")),
        Station::new("S11", Some("A8")),
        Station::new("S12", Some("A6")),
    ]
}

/// 16 名员工,按专业分布技能
fn create_employees(horizon: &[NaiveDate]) -> Vec<Employee> {
    let mut employees = Vec::new();

    // 电气装配 (A1, A4)
    for i in 1..=3 {
        employees.push(Employee::new(
            &format!("E{}", i),
            &format!("电气装配工{}", i),
            &["A1", "A4"],
            horizon,
        ));
    }
    // 电子工艺 (A2, A7)
    for i in 4..=6 {
        employees.push(Employee::new(
            &format!("E{}", i),
            &format!("电子工艺员{}", i),
            &["A2", "A7"],
            horizon,
        ));
    }
    // 机械装配 (A3)
    for i in 7..=9 {
        employees.push(Employee::new(
            &format!("E{}", i),
            &format!("机械装配工{}", i),
            &["A3"],
            horizon,
        ));
    }
    // 质检 (A5, A8)
    for i in 10..=12 {
        employees.push(Employee::new(
            &format!("E{}", i),
            &format!("质检员{}", i),
            &["A5", "A8"],
            horizon,
        ));
    }
    // 多能工 (A6 + 装配支援)
    for i in 13..=16 {
        employees.push(Employee::new(
            &format!("E{}", i),
            &format!("多能工{}", i),
            &["A6", "A1", "A3"],
            horizon,
        ));
    }

    employees
}

/// 三张优先级梯度分明的工单
fn create_purchase_orders(today: NaiveDate) -> Vec<PurchaseOrder> {
    vec![
        PurchaseOrder::new("PO-101", today + Duration::days(5), 90, 75_000.0, 20),
        PurchaseOrder::new("PO-102", today + Duration::days(8), 70, 45_000.0, 30),
        PurchaseOrder::new("PO-103", today + Duration::days(10), 50, 30_000.0, 15),
    ]
}

/// 每张工单的标准八道工艺流
///
/// 1 面板装配 -> (2a 电路板预处理 / 2b 壳体装配) -> 3 PCB 装配
/// -> 4 布线 -> 5 测试 -> 6 质量检验 -> 7 包装
fn create_production_steps() -> Vec<ProductionStep> {
    let mut steps = Vec::new();

    for po_num in [101, 102, 103] {
        let po_id = format!("PO-{}", po_num);
        let panel_step = format!("ST-{}-1", po_num);
        let circuit_step = format!("ST-{}-2", po_num);
        let pcb_step = format!("ST-{}-4", po_num);
        let wiring_step = format!("ST-{}-5", po_num);
        let testing_step = format!("ST-{}-6", po_num);
        let qc_step = format!("ST-{}-7", po_num);

        steps.push(step(&panel_step, &po_id, "A1", 1, 1.0, 0.5, 5, 0, &[]));
        steps.push(step(&circuit_step, &po_id, "A2", 2, 1.0, 0.5, 4, 0, &[]));
        steps.push(step(
            &format!("ST-{}-3", po_num),
            &po_id,
            "A3",
            2,
            0.25,
            0.125,
            4,
            1,
            &[],
        ));
        steps.push(step(&pcb_step, &po_id, "A7", 3, 0.25, 0.125, 3, 2, &[&circuit_step]));
        steps.push(step(
            &wiring_step,
            &po_id,
            "A4",
            4,
            0.25,
            0.125,
            3,
            2,
            &[&panel_step, &pcb_step],
        ));
        steps.push(step(&testing_step, &po_id, "A5", 5, 0.125, 0.125, 6, 3, &[&wiring_step]));
        steps.push(step(&qc_step, &po_id, "A8", 6, 0.125, 0.125, 6, 3, &[&testing_step]));
        steps.push(step(
            &format!("ST-{}-8", po_num),
            &po_id,
            "A6",
            7,
            0.125,
            0.125,
            8,
            3,
            &[&qc_step],
        ));
    }

    steps
}

#[allow(clippy::too_many_arguments)]
fn step(
    step_id: &str,
    po_id: &str,
    activity_id: &str,
    step_order: u32,
    duration_days: f64,
    setup_days: f64,
    units_per_station: u32,
    min_units_to_start: u32,
    depends_on: &[&str],
) -> ProductionStep {
    ProductionStep {
        step_id: step_id.to_string(),
        purchase_order_id: po_id.to_string(),
        activity_id: activity_id.to_string(),
        step_order,
        duration_days,
        setup_time_days: setup_days,
        teardown_time_days: setup_days,
        units_per_station,
        min_units_to_start,
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
    }
}

// ==========================================
// 结果报告
// ==========================================

/// 按日期/班次打印排产明细与工单进度
fn print_schedule_report(
    tasks: &[ScheduledTask],
    employees: &[Employee],
    orders: &[PurchaseOrder],
) {
    if tasks.is_empty() {
        println!("没有排产任务");
        return;
    }

    let mut by_shift: BTreeMap<(NaiveDate, TimeSlot), Vec<&ScheduledTask>> = BTreeMap::new();
    for task in tasks {
        by_shift.entry((task.day, task.time_slot)).or_default().push(task);
    }

    println!("\n=== 排产报告 ===");
    for ((day, slot), shift_tasks) in &by_shift {
        println!("\n{} - {} 班:", day, slot);
        let mut sorted = shift_tasks.clone();
        sorted.sort_by(|a, b| a.station_id.cmp(&b.station_id));
        for task in sorted {
            let employee_name = task
                .employee_id
                .as_ref()
                .and_then(|id| employees.iter().find(|e| &e.id == id))
                .map(|e| e.name.as_str())
                .unwrap_or("未分配");
            println!(
                "  工位 {}: 工序 {} (工种 {}, 件 {}-{}, {})",
                task.station_id,
                task.step_id,
                task.activity_id,
                task.units_start,
                task.units_end,
                employee_name
            );
        }
    }

    println!("\n=== 工单进度 ===");
    for po in orders {
        let scheduled_units: usize = tasks
            .iter()
            .filter(|t| t.purchase_order_id == po.id)
            .map(|t| t.unit_count() as usize)
            .sum();
        println!(
            "  工单 {}: 已排 {} 件次 (总量 {} 件/工序, 有效优先级 {:.1})",
            po.id, scheduled_units, po.units, po.effective_priority
        );
    }
}
