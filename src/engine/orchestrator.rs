// ==========================================
// 车间工单排产系统 - 排产编排器
// ==========================================
// 职责: 驱动 {优先级 -> 排程 -> 分配 -> 校验 -> 改进/记录 -> 锁定} 迭代循环
// 状态: 运行上下文 (锁定集合 + 违规历史) 显式传递,不用全局可变状态
// 红线: 锁定集合只增不减
// 红线: 迭代耗尽仍无可行解时,返回最后候选并标记不可行,绝不谎报成功
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::{
    Activity, Employee, IterationRecord, LockedAssignment, ProductionStep, PurchaseOrder,
    ScheduledTask, Station,
};
use crate::engine::{
    ConstraintValidator, PriorityScorer, RefinementEngine, ResourceAssigner, ScheduleScorer,
    StepSequencer,
};
use crate::error::{ConfigurationError, SchedulingResult};
use crate::narrative::{NarrativeReporter, NoOpNarrator, ScheduleDigest};
use crate::proposer::{ModificationProposer, NoOpProposer};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// RunContext - 运行上下文
// ==========================================
// 跨迭代的可变状态集中在此处,由编排器独占持有
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub today: NaiveDate,
    pub locked: HashSet<LockedAssignment>,
    pub history: Vec<IterationRecord>,
}

impl RunContext {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            today,
            locked: HashSet::new(),
            history: Vec::new(),
        }
    }
}

// ==========================================
// ScheduleOutcome - 排产结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ScheduleOutcome {
    pub run_id: String,
    pub tasks: Vec<ScheduledTask>,
    pub feasible: bool,
    pub score: f64,
    pub iterations: usize,
    pub locked: HashSet<LockedAssignment>,
    pub history: Vec<IterationRecord>,
}

// ==========================================
// SchedulingOrchestrator - 排产编排器
// ==========================================
pub struct SchedulingOrchestrator {
    priority: PriorityScorer,
    sequencer: StepSequencer,
    assigner: ResourceAssigner,
    validator: ConstraintValidator,
    scorer: ScheduleScorer,
    refinement: RefinementEngine,
    narrator: Arc<dyn NarrativeReporter>,
    activities: Vec<Activity>,
    employees: Vec<Employee>,
    config: SchedulerConfig,
}

impl SchedulingOrchestrator {
    /// 创建编排器并装配全部子引擎
    ///
    /// # 参数
    /// - `activities`: 工种参考数据
    /// - `stations`: 工位列表
    /// - `employees`: 员工列表
    /// - `horizon`: 排程窗口日期 (按时间顺序)
    /// - `config`: 排产配置
    /// - `proposer`: 外部改进建议提供方
    /// - `narrator`: 解说文本提供方 (仅日志消费)
    pub fn new(
        activities: Vec<Activity>,
        stations: Vec<Station>,
        employees: Vec<Employee>,
        horizon: Vec<NaiveDate>,
        config: SchedulerConfig,
        proposer: Arc<dyn ModificationProposer>,
        narrator: Arc<dyn NarrativeReporter>,
    ) -> Self {
        let scorer = ScheduleScorer::new(config.stations_per_shift, horizon.len());
        let sequencer = StepSequencer::new(stations, horizon, config.stations_per_shift);
        let assigner = ResourceAssigner::new(employees.clone());
        let validator = ConstraintValidator::new(config.medium_violation_tolerance);
        let refinement = RefinementEngine::new(proposer, config.proposer_timeout_ms);

        Self {
            priority: PriorityScorer::new(),
            sequencer,
            assigner,
            validator,
            scorer,
            refinement,
            narrator,
            activities,
            employees,
            config,
        }
    }

    /// 创建基线编排器: 默认配置 + 空操作协作者
    pub fn with_defaults(
        activities: Vec<Activity>,
        stations: Vec<Station>,
        employees: Vec<Employee>,
        horizon: Vec<NaiveDate>,
    ) -> Self {
        Self::new(
            activities,
            stations,
            employees,
            horizon,
            SchedulerConfig::default(),
            Arc::new(NoOpProposer),
            Arc::new(NoOpNarrator),
        )
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行完整排产循环
    ///
    /// 每轮迭代:
    /// 1) 重算工单有效优先级
    /// 2) 逐班次排程 (锁定件号视为已完成)
    /// 3) 为任务分配员工
    /// 4) 可行性校验
    ///    - 不可行: 违规写入历史,进入下一轮,不保留本轮候选
    ///    - 可行: 执行单轮改进并评分,必要时替换最优解,然后锁定
    /// 5) 锁定: 无前置或前置已全部锁定的任务晋升为锁定分配
    ///
    /// 迭代耗尽后返回最优可行解;从未可行则返回最后候选 + feasible=false。
    #[instrument(skip(self, orders, steps), fields(
        orders_count = orders.len(),
        steps_count = steps.len(),
        today = %today,
        max_iterations = self.config.max_iterations
    ))]
    pub async fn run(
        &self,
        orders: &mut [PurchaseOrder],
        steps: &[ProductionStep],
        today: NaiveDate,
    ) -> SchedulingResult<ScheduleOutcome> {
        // 前置校验: 配置错误直接中止
        self.validate_problem(steps)?;

        let mut ctx = RunContext::new(today);
        let mut best: Option<(Vec<ScheduledTask>, f64)> = None;
        let mut last_candidate: Vec<ScheduledTask> = Vec::new();

        info!(run_id = %ctx.run_id, "开始排产循环");

        for iteration in 1..=self.config.max_iterations {
            info!(iteration, "---- 迭代开始 ----");

            // ==========================================
            // 步骤1: 优先级重算
            // ==========================================
            debug!("步骤1: 重算工单有效优先级");
            self.priority.update_priorities(orders, ctx.today);

            // ==========================================
            // 步骤2: 工序排程
            // ==========================================
            debug!("步骤2: 逐班次排程");
            let mut tasks = self.sequencer.build_schedule(orders, steps, &ctx.locked);

            // ==========================================
            // 步骤3: 资源分配
            // ==========================================
            debug!("步骤3: 填充员工分配");
            self.assigner.assign_resources(&mut tasks, steps)?;

            // ==========================================
            // 步骤4: 可行性校验
            // ==========================================
            debug!("步骤4: 可行性校验");
            let report = self.validator.check_feasibility(&tasks, steps, &self.employees);

            if !report.feasible {
                warn!(
                    iteration,
                    violations = report.violations.len(),
                    "候选排产不可行,记录违规后进入下一轮"
                );
                self.narrate(&ScheduleDigest {
                    iteration,
                    feasible: false,
                    score: self.scorer.score(&tasks),
                    task_count: tasks.len(),
                    violation_count: report.violations.len(),
                    locked_count: ctx.locked.len(),
                });
                ctx.history.push(IterationRecord {
                    iteration,
                    violations: report.violations,
                });
                last_candidate = tasks;
                continue;
            }

            // ==========================================
            // 步骤4b: 单轮改进
            // ==========================================
            debug!("步骤4b: 征集并验收改进建议");
            let refined = self
                .refinement
                .refine(
                    &tasks,
                    steps,
                    &self.employees,
                    &ctx.history,
                    &self.validator,
                    &self.scorer,
                )
                .await;

            let score = self.scorer.score(&refined);
            let is_new_best = best.as_ref().map_or(true, |(_, best_score)| score > *best_score);
            if is_new_best {
                best = Some((refined.clone(), score));
            }
            info!(iteration, score, is_new_best, "候选排产可行");

            // ==========================================
            // 步骤5: 锁定晋升
            // ==========================================
            debug!("步骤5: 锁定晋升");
            let new_locks = self.identify_lockable(&refined, steps, &ctx.locked);
            let before = ctx.locked.len();
            ctx.locked.extend(new_locks);
            info!(
                iteration,
                locked_added = ctx.locked.len() - before,
                locked_total = ctx.locked.len(),
                "锁定集合已更新"
            );

            self.narrate(&ScheduleDigest {
                iteration,
                feasible: true,
                score,
                task_count: refined.len(),
                violation_count: 0,
                locked_count: ctx.locked.len(),
            });

            last_candidate = refined;
        }

        // ==========================================
        // 终局: 返回最优可行解或最后候选
        // ==========================================
        let outcome = match best {
            Some((tasks, score)) => ScheduleOutcome {
                run_id: ctx.run_id.clone(),
                tasks,
                feasible: true,
                score,
                iterations: self.config.max_iterations,
                locked: ctx.locked,
                history: ctx.history,
            },
            None => {
                let score = self.scorer.score(&last_candidate);
                ScheduleOutcome {
                    run_id: ctx.run_id.clone(),
                    tasks: last_candidate,
                    feasible: false,
                    score,
                    iterations: self.config.max_iterations,
                    locked: ctx.locked,
                    history: ctx.history,
                }
            }
        };

        info!(
            run_id = %ctx.run_id,
            feasible = outcome.feasible,
            score = outcome.score,
            tasks_count = outcome.tasks.len(),
            locked_count = outcome.locked.len(),
            "排产循环结束"
        );

        Ok(outcome)
    }

    // ==========================================
    // 前置校验
    // ==========================================

    /// 排产前配置校验: 人员、工种、依赖图
    fn validate_problem(&self, steps: &[ProductionStep]) -> SchedulingResult<()> {
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

        let activity_ids: HashSet<&str> = self.activities.iter().map(|a| a.id.as_str()).collect();
        for step in steps {
            if step.activity_id.is_empty() {
                return Err(ConfigurationError::MissingActivity {
                    step_id: step.step_id.clone(),
                });
            }
            if !activity_ids.contains(step.activity_id.as_str()) {
                return Err(ConfigurationError::UnknownActivity {
                    step_id: step.step_id.clone(),
                    activity_id: step.activity_id.clone(),
                });
            }
            if !self
                .employees
                .iter()
                .any(|emp| emp.skills.contains(&step.activity_id))
            {
                return Err(ConfigurationError::NoQualifiedEmployees {
                    activity_id: step.activity_id.clone(),
                });
            }
        }

        self.reject_dependency_cycles(steps)
    }

    /// 依赖环检测: 迭代式 Kahn 消去,剩余未消去的工序即成环
    ///
    /// depends_on 中指向未知工序的引用不算错误 (该工序只是永不放行)。
    fn reject_dependency_cycles(&self, steps: &[ProductionStep]) -> SchedulingResult<()> {
        let known_ids: HashSet<&str> = steps.iter().map(|s| s.step_id.as_str()).collect();

        let mut indegree: HashMap<&str, usize> =
            steps.iter().map(|s| (s.step_id.as_str(), 0)).collect();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for step in steps {
            for dep_id in &step.depends_on {
                if known_ids.contains(dep_id.as_str()) {
                    *indegree.get_mut(step.step_id.as_str()).expect("工序已登记") += 1;
                    dependents
                        .entry(dep_id.as_str())
                        .or_default()
                        .push(step.step_id.as_str());
                }
            }
        }

        let mut queue: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut removed = 0usize;
        while let Some(id) = queue.pop_front() {
            removed += 1;
            for &dependent in dependents.get(id).map(|v| v.as_slice()).unwrap_or(&[]) {
                let degree = indegree.get_mut(dependent).expect("工序已登记");
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if removed < steps.len() {
            let mut remaining: Vec<String> = indegree
                .iter()
                .filter(|(_, &degree)| degree > 0)
                .map(|(&id, _)| id.to_string())
                .collect();
            remaining.sort();
            return Err(ConfigurationError::DependencyCycle {
                step_ids: remaining,
            });
        }

        Ok(())
    }

    // ==========================================
    // 锁定晋升
    // ==========================================

    /// 找出可晋升为锁定分配的任务
    ///
    /// 条件: 工序无前置,或每个前置工序在进入本轮前已在锁定集合中。
    fn identify_lockable(
        &self,
        tasks: &[ScheduledTask],
        steps: &[ProductionStep],
        locked: &HashSet<LockedAssignment>,
    ) -> Vec<LockedAssignment> {
        let step_lookup: HashMap<&str, &ProductionStep> =
            steps.iter().map(|s| (s.step_id.as_str(), s)).collect();
        let locked_step_ids: HashSet<&str> = locked.iter().map(|l| l.step_id.as_str()).collect();

        let mut new_locks = Vec::new();
        for task in tasks {
            let step = match step_lookup.get(task.step_id.as_str()) {
                Some(step) => step,
                None => continue,
            };
            let lockable = step.depends_on.is_empty()
                || step
                    .depends_on
                    .iter()
                    .all(|dep_id| locked_step_ids.contains(dep_id.as_str()));
            if lockable {
                new_locks.push(LockedAssignment::from_task(task));
            }
        }
        new_locks
    }

    // ==========================================
    // 解说消费
    // ==========================================

    /// 调用解说方并把结果写入日志;失败无害
    fn narrate(&self, digest: &ScheduleDigest) {
        match self.narrator.describe(digest) {
            Ok(text) if !text.is_empty() => {
                info!(iteration = digest.iteration, narrative = %text, "排产解说");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "解说生成失败,忽略"),
        }
    }
}
