// ==========================================
// 车间工单排产系统 - 引擎层
// ==========================================
// 职责: 实现排产业务规则引擎
// 红线: 引擎只处理内存数据,所有判定必须可解释
// ==========================================

pub mod assigner;
pub mod orchestrator;
pub mod priority;
pub mod refinement;
pub mod scorer;
pub mod sequencer;
pub mod validator;

// 重导出核心引擎
pub use assigner::ResourceAssigner;
pub use orchestrator::{RunContext, ScheduleOutcome, SchedulingOrchestrator};
pub use priority::PriorityScorer;
pub use refinement::RefinementEngine;
pub use scorer::ScheduleScorer;
pub use sequencer::StepSequencer;
pub use validator::{ConstraintValidator, FeasibilityReport};
