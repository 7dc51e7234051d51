// ==========================================
// 车间工单排产系统 - 资源分配引擎
// ==========================================
// 职责: 按技能匹配与负载均衡为任务填充员工
// 输入: 排产任务列表 (employee_id 可能为空) + 工序
// 输出: 就地填充 employee_id
// 红线: 出勤/超载不在此处硬约束,以约束校验引擎为准
// ==========================================

use crate::domain::{Employee, ProductionStep, ScheduledTask, TimeSlot};
use crate::error::{ConfigurationError, SchedulingResult};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, instrument};

// ==========================================
// ResourceAssigner - 资源分配引擎
// ==========================================
pub struct ResourceAssigner {
    employees: Vec<Employee>,
}

impl ResourceAssigner {
    pub fn new(employees: Vec<Employee>) -> Self {
        Self { employees }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 为缺少员工的任务分配合格员工
    ///
    /// 流程:
    /// 1) 按所需工种分组 (保持首次出现的工种顺序,组内保持输入顺序)
    /// 2) 对每个缺员任务,在掌握该工种的员工中选择当前班次负载最小者;
    ///    负载 = Σ 同员工同日同班次已分配任务的 (件数 × 单件天数)
    ///
    /// # 错误
    /// - 没有员工 / 员工技能为空 / 工序缺失工种 / 工种没有合格员工
    #[instrument(skip(self, tasks, steps), fields(
        tasks_count = tasks.len(),
        employees_count = self.employees.len()
    ))]
    pub fn assign_resources(
        &self,
        tasks: &mut [ScheduledTask],
        steps: &[ProductionStep],
    ) -> SchedulingResult<()> {
        if self.employees.is_empty() {
            return Err(ConfigurationError::NoEmployees);
        }
        for emp in &self.employees {
            if emp.skills.is_empty() {
                return Err(ConfigurationError::EmployeeWithoutSkills {
                    employee_id: emp.id.clone(),
                });
            }
        }

        let step_lookup: HashMap<&str, &ProductionStep> =
            steps.iter().map(|s| (s.step_id.as_str(), s)).collect();

        // 按工种分组任务下标,保持首次出现的工种顺序
        let mut activity_order: Vec<String> = Vec::new();
        let mut tasks_by_activity: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, task) in tasks.iter().enumerate() {
            let step = step_lookup.get(task.step_id.as_str());
            let activity_id = match step {
                Some(s) if !s.activity_id.is_empty() => s.activity_id.clone(),
                _ => {
                    return Err(ConfigurationError::MissingActivity {
                        step_id: task.step_id.clone(),
                    })
                }
            };
            if !tasks_by_activity.contains_key(&activity_id) {
                activity_order.push(activity_id.clone());
            }
            tasks_by_activity.entry(activity_id).or_default().push(idx);
        }

        // 当前负载: 先累计已分配任务 (锁定沿用的员工分配也计入)
        let mut loads: HashMap<(String, NaiveDate, TimeSlot), f64> = HashMap::new();
        for task in tasks.iter() {
            if let Some(employee_id) = &task.employee_id {
                let duration = step_lookup
                    .get(task.step_id.as_str())
                    .map_or(0.0, |s| s.duration_days);
                *loads
                    .entry((employee_id.clone(), task.day, task.time_slot))
                    .or_insert(0.0) += task.unit_count() as f64 * duration;
            }
        }

        // 按工种逐组分配
        for activity_id in &activity_order {
            let qualified: Vec<&Employee> = self
                .employees
                .iter()
                .filter(|emp| emp.skills.contains(activity_id))
                .collect();
            if qualified.is_empty() {
                return Err(ConfigurationError::NoQualifiedEmployees {
                    activity_id: activity_id.clone(),
                });
            }

            for &idx in &tasks_by_activity[activity_id] {
                if tasks[idx].employee_id.is_some() {
                    continue;
                }

                let day = tasks[idx].day;
                let time_slot = tasks[idx].time_slot;
                // 稳定取最小负载: 并列时取员工列表中先出现者
                let mut best: Option<(&Employee, f64)> = None;
                for &emp in &qualified {
                    let load = loads
                        .get(&(emp.id.clone(), day, time_slot))
                        .copied()
                        .unwrap_or(0.0);
                    match best {
                        Some((_, best_load)) if load >= best_load => {}
                        _ => best = Some((emp, load)),
                    }
                }

                let (chosen, _) = best.expect("合格员工列表非空");
                let duration = step_lookup
                    .get(tasks[idx].step_id.as_str())
                    .map_or(0.0, |s| s.duration_days);
                *loads
                    .entry((chosen.id.clone(), day, time_slot))
                    .or_insert(0.0) += tasks[idx].unit_count() as f64 * duration;
                tasks[idx].employee_id = Some(chosen.id.clone());

                debug!(
                    task_id = %tasks[idx].task_id,
                    activity_id = %activity_id,
                    employee_id = %chosen.id,
                    "任务已分配员工"
                );
            }
        }

        Ok(())
    }
}
