// ==========================================
// 车间工单排产系统 - 排产改进引擎
// ==========================================
// 职责: 单轮"建议-验收"局部改进
// 输入: 当前任务 + 历史违规 + 外部改进建议提供方
// 输出: 改进后的任务列表 (或原样返回)
// 红线: 只有"可行 且 分值严格提升"的建议才被采纳
// 红线: 提供方超时/出错/内容非法一律降级为不改,绝不中断运行
// ==========================================

use crate::domain::{Employee, IterationRecord, ProductionStep, ScheduledTask, TimeSlot};
use crate::engine::scorer::ScheduleScorer;
use crate::engine::validator::ConstraintValidator;
use crate::proposer::{ModificationProposer, ProposerError, ScheduleProposal, TaskModification};
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

// ==========================================
// RefinementEngine - 排产改进引擎
// ==========================================
pub struct RefinementEngine {
    proposer: Arc<dyn ModificationProposer>,
    timeout: Duration,
}

// 一条校验通过的字段级编辑
struct ParsedEdit {
    task_idx: usize,
    employee_id: Option<Option<String>>,
    day: Option<NaiveDate>,
    time_slot: Option<TimeSlot>,
    station_id: Option<String>,
}

impl RefinementEngine {
    pub fn new(proposer: Arc<dyn ModificationProposer>, timeout_ms: u64) -> Self {
        Self {
            proposer,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 单轮改进: 征集建议 -> 草稿应用 -> 可行性与分值把关
    ///
    /// 每次调用恰好一轮建议与验收;验收失败返回原任务列表。
    #[instrument(skip_all, fields(tasks_count = tasks.len()))]
    pub async fn refine(
        &self,
        tasks: &[ScheduledTask],
        steps: &[ProductionStep],
        employees: &[Employee],
        history: &[IterationRecord],
        validator: &ConstraintValidator,
        scorer: &ScheduleScorer,
    ) -> Vec<ScheduledTask> {
        let current_score = scorer.score(tasks);

        // 外部调用必须限时,超时与出错都降级为空建议
        let proposal = match tokio::time::timeout(
            self.timeout,
            self.proposer.propose(tasks, steps, employees, history),
        )
        .await
        {
            Ok(Ok(proposal)) => proposal,
            Ok(Err(e)) => {
                warn!(error = %e, "改进建议获取失败,本轮不改");
                return tasks.to_vec();
            }
            Err(_) => {
                let e = ProposerError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                };
                warn!(error = %e, "改进建议调用超时,本轮不改");
                return tasks.to_vec();
            }
        };

        if proposal.is_empty() {
            debug!("空建议,本轮不改");
            return tasks.to_vec();
        }

        // 草稿应用: 逐条校验,非法编辑整条拒绝
        let mut scratch = tasks.to_vec();
        let applied = self.apply_proposal(&mut scratch, &proposal);
        if applied == 0 {
            debug!("全部编辑被拒绝,本轮不改");
            return tasks.to_vec();
        }

        // 验收: 必须可行且分值严格提升
        let report = validator.check_feasibility(&scratch, steps, employees);
        if !report.feasible {
            info!(
                violations = report.violations.len(),
                "建议应用后不可行,放弃改动"
            );
            return tasks.to_vec();
        }

        let new_score = scorer.score(&scratch);
        if new_score > current_score {
            info!(
                applied,
                current_score,
                new_score,
                rationale = proposal.rationale.as_deref().unwrap_or(""),
                "改进建议被采纳"
            );
            scratch
        } else {
            info!(current_score, new_score, "建议未带来分值提升,放弃改动");
            tasks.to_vec()
        }
    }

    // ==========================================
    // 编辑校验与应用
    // ==========================================

    /// 应用建议中的全部合法编辑,返回实际应用条数
    fn apply_proposal(&self, tasks: &mut [ScheduledTask], proposal: &ScheduleProposal) -> usize {
        let mut applied = 0usize;
        for modification in &proposal.modifications {
            match self.parse_modification(tasks, modification) {
                Some(edit) => {
                    let task = &mut tasks[edit.task_idx];
                    if let Some(employee_id) = edit.employee_id {
                        task.employee_id = employee_id;
                    }
                    if let Some(day) = edit.day {
                        task.day = day;
                    }
                    if let Some(time_slot) = edit.time_slot {
                        task.time_slot = time_slot;
                    }
                    if let Some(station_id) = edit.station_id {
                        task.station_id = station_id;
                    }
                    applied += 1;
                }
                None => {
                    warn!(task_id = %modification.task_id, "编辑被拒绝,未应用");
                }
            }
        }
        applied
    }

    /// 校验单条编辑: 任务ID必须存在,字段名与取值必须全部合法,
    /// 任何一项不合法则整条拒绝 (绝不部分应用)
    fn parse_modification(
        &self,
        tasks: &[ScheduledTask],
        modification: &TaskModification,
    ) -> Option<ParsedEdit> {
        let task_idx = tasks
            .iter()
            .position(|t| t.task_id == modification.task_id)?;

        let mut edit = ParsedEdit {
            task_idx,
            employee_id: None,
            day: None,
            time_slot: None,
            station_id: None,
        };

        for (field, value) in &modification.changes {
            match field.as_str() {
                "employee_id" => match value {
                    Value::String(s) => edit.employee_id = Some(Some(s.clone())),
                    Value::Null => edit.employee_id = Some(None),
                    _ => return None,
                },
                "day" => {
                    let s = value.as_str()?;
                    let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
                    edit.day = Some(day);
                }
                "time_slot" => {
                    let s = value.as_str()?;
                    edit.time_slot = Some(TimeSlot::parse(s)?);
                }
                "station_id" => {
                    edit.station_id = Some(value.as_str()?.to_string());
                }
                // 未知字段: 整条拒绝
                _ => return None,
            }
        }

        Some(edit)
    }
}
