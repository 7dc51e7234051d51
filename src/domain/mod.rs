// ==========================================
// 车间工单排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、不变量检查
// 红线: 不含引擎逻辑,不含外部协作者调用
// ==========================================

pub mod order;
pub mod resource;
pub mod schedule;
pub mod types;
pub mod violation;

// 重导出核心类型
pub use order::{ProductionStep, PurchaseOrder};
pub use resource::{Activity, Employee, Station};
pub use schedule::{LockedAssignment, ScheduledTask};
pub use types::{Severity, TimeSlot};
pub use violation::{ConstraintViolation, IterationRecord};
