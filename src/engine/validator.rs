// ==========================================
// 车间工单排产系统 - 约束校验引擎
// ==========================================
// 职责: 产出按类别建模的违规记录 + 严重度加权可行性判定
// 输入: 排产任务 + 工序 + 员工
// 输出: FeasibilityReport (违规是数据,不抛异常)
// 判定: 高严重违规为零 且 中等违规不超过容忍上限 => 可行
// ==========================================

use crate::domain::{
    ConstraintViolation, Employee, ProductionStep, ScheduledTask, Severity, TimeSlot,
};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, instrument};

// ==========================================
// FeasibilityReport - 可行性报告
// ==========================================
#[derive(Debug, Clone)]
pub struct FeasibilityReport {
    pub feasible: bool,
    pub violations: Vec<ConstraintViolation>,
}

impl FeasibilityReport {
    /// 按严重等级统计违规数量
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity() == severity)
            .count()
    }
}

// ==========================================
// ConstraintValidator - 约束校验引擎
// ==========================================
pub struct ConstraintValidator {
    /// 可行性判定允许的中等违规数量上限
    medium_violation_tolerance: usize,
}

impl ConstraintValidator {
    pub fn new(medium_violation_tolerance: usize) -> Self {
        Self {
            medium_violation_tolerance,
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 校验排产可行性
    ///
    /// 检查顺序:
    /// 1) 员工出勤与技能 (未分配员工的任务跳过员工类检查)
    /// 2) 员工班次跨度
    /// 3) 工位冲突 (同工位同日同班次多任务)
    /// 4) 依赖完整性与放行件数
    #[instrument(skip(self, tasks, steps, employees), fields(
        tasks_count = tasks.len(),
        steps_count = steps.len()
    ))]
    pub fn check_feasibility(
        &self,
        tasks: &[ScheduledTask],
        steps: &[ProductionStep],
        employees: &[Employee],
    ) -> FeasibilityReport {
        let mut violations: Vec<ConstraintViolation> = Vec::new();

        let step_lookup: HashMap<&str, &ProductionStep> =
            steps.iter().map(|s| (s.step_id.as_str(), s)).collect();
        let employee_lookup: HashMap<&str, &Employee> =
            employees.iter().map(|e| (e.id.as_str(), e)).collect();

        // 分组索引
        let mut tasks_by_worker_day: HashMap<(String, NaiveDate), Vec<&ScheduledTask>> =
            HashMap::new();
        let mut tasks_by_station_day: HashMap<(String, NaiveDate), Vec<&ScheduledTask>> =
            HashMap::new();
        let mut tasks_by_step: HashMap<String, Vec<&ScheduledTask>> = HashMap::new();

        for task in tasks {
            if let Some(employee_id) = &task.employee_id {
                tasks_by_worker_day
                    .entry((employee_id.clone(), task.day))
                    .or_default()
                    .push(task);
            }
            tasks_by_station_day
                .entry((task.station_id.clone(), task.day))
                .or_default()
                .push(task);
            tasks_by_step
                .entry(task.step_id.clone())
                .or_default()
                .push(task);
        }

        // 1. 员工出勤与技能
        let mut worker_day_keys: Vec<&(String, NaiveDate)> = tasks_by_worker_day.keys().collect();
        worker_day_keys.sort();
        for key in worker_day_keys {
            let (employee_id, day) = key;
            let worker_tasks = &tasks_by_worker_day[key];

            match employee_lookup.get(employee_id.as_str()) {
                Some(employee) => {
                    if !employee.availability.contains(day) {
                        violations.push(ConstraintViolation::EmployeeUnavailable {
                            employee_id: employee_id.clone(),
                            day: *day,
                        });
                    }

                    for task in worker_tasks {
                        if let Some(step) = step_lookup.get(task.step_id.as_str()) {
                            if !employee.skills.contains(&step.activity_id) {
                                violations.push(ConstraintViolation::SkillMismatch {
                                    employee_id: employee_id.clone(),
                                    step_id: task.step_id.clone(),
                                    activity_id: step.activity_id.clone(),
                                });
                            }
                        }
                    }
                }
                // 未知员工ID (只可能来自外部改进建议的编辑): 按不可出勤处理
                None => violations.push(ConstraintViolation::EmployeeUnavailable {
                    employee_id: employee_id.clone(),
                    day: *day,
                }),
            }
        }

        // 2. 员工班次跨度
        let mut worker_day_keys: Vec<&(String, NaiveDate)> = tasks_by_worker_day.keys().collect();
        worker_day_keys.sort();
        for key in worker_day_keys {
            let (employee_id, day) = key;
            let shifts: BTreeSet<TimeSlot> = tasks_by_worker_day[key]
                .iter()
                .map(|t| t.time_slot)
                .collect();
            if shifts.len() > 2 {
                violations.push(ConstraintViolation::WorkerOverload {
                    employee_id: employee_id.clone(),
                    day: *day,
                    shifts: shifts.into_iter().collect(),
                });
            }
        }

        // 3. 工位冲突
        let mut station_day_keys: Vec<&(String, NaiveDate)> = tasks_by_station_day.keys().collect();
        station_day_keys.sort();
        for key in station_day_keys {
            let (station_id, day) = key;
            let station_tasks = &tasks_by_station_day[key];
            let am_count = station_tasks
                .iter()
                .filter(|t| t.time_slot == TimeSlot::Am)
                .count();
            let pm_count = station_tasks
                .iter()
                .filter(|t| t.time_slot == TimeSlot::Pm)
                .count();
            if am_count > 1 || pm_count > 1 {
                violations.push(ConstraintViolation::StationConflict {
                    station_id: station_id.clone(),
                    day: *day,
                });
            }
        }

        // 4. 依赖完整性与放行件数
        for step in steps {
            if !tasks_by_step.contains_key(&step.step_id) {
                // 本工序没有排产任务,依赖检查不适用
                continue;
            }

            for dep_id in &step.depends_on {
                let dep_tasks = match tasks_by_step.get(dep_id) {
                    Some(dep_tasks) => dep_tasks,
                    None => {
                        violations.push(ConstraintViolation::MissingDependency {
                            step_id: step.step_id.clone(),
                            dependency_id: dep_id.clone(),
                        });
                        continue;
                    }
                };

                let mut dep_units: HashSet<u32> = HashSet::new();
                for dep_task in dep_tasks {
                    dep_units.extend(dep_task.units());
                }

                if dep_units.len() < step.min_units_to_start as usize {
                    violations.push(ConstraintViolation::InsufficientUnits {
                        step_id: step.step_id.clone(),
                        dependency_id: dep_id.clone(),
                        units_available: dep_units.len() as u32,
                        units_needed: step.min_units_to_start,
                    });
                }
            }
        }

        // 严重度加权判定
        let high_count = violations
            .iter()
            .filter(|v| v.severity() == Severity::High)
            .count();
        let medium_count = violations
            .iter()
            .filter(|v| v.severity() == Severity::Medium)
            .count();
        let feasible = high_count == 0 && medium_count <= self.medium_violation_tolerance;

        debug!(
            high_count,
            medium_count,
            feasible,
            "可行性校验完成"
        );

        FeasibilityReport {
            feasible,
            violations,
        }
    }
}

impl Default for ConstraintValidator {
    fn default() -> Self {
        Self::new(2)
    }
}
