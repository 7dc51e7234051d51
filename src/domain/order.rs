// ==========================================
// 车间工单排产系统 - 工单与工序领域模型
// ==========================================
// 职责: 采购工单 (PurchaseOrder) 与生产工序 (ProductionStep)
// 红线: effective_priority 只由优先级引擎重算,始终夹在 [1,100]
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// PurchaseOrder - 采购工单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: String,                // 工单ID
    pub due_date: NaiveDate,       // 交付日期
    pub base_priority: i32,        // 基础优先级 [1,100]
    pub value: f64,                // 合同价值
    pub units: u32,                // 总件数 (可分割的最小工作单位)
    pub effective_priority: f64,   // 有效优先级 (派生值,每轮迭代重算)
}

impl PurchaseOrder {
    /// 创建新工单,有效优先级初始化为基础优先级
    pub fn new(id: &str, due_date: NaiveDate, base_priority: i32, value: f64, units: u32) -> Self {
        Self {
            id: id.to_string(),
            due_date,
            base_priority,
            value,
            units,
            effective_priority: base_priority as f64,
        }
    }
}

// ==========================================
// ProductionStep - 生产工序
// ==========================================
// depends_on 只允许引用同一工单内的工序,且必须无环
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionStep {
    pub step_id: String,            // 工序ID
    pub purchase_order_id: String,  // 所属工单
    pub activity_id: String,        // 所需工种
    pub step_order: u32,            // 工艺顺序号
    pub duration_days: f64,         // 单件加工天数
    pub setup_time_days: f64,       // 换型准备天数
    pub teardown_time_days: f64,    // 收尾清理天数

    /// 单工位单班次最多可加工件数
    #[serde(default = "default_units_per_station")]
    pub units_per_station: u32,

    /// 上游工序至少完成多少件后本工序才能开工
    #[serde(default = "default_min_units_to_start")]
    pub min_units_to_start: u32,

    /// 前置工序ID列表 (同工单内,无环)
    #[serde(default)]
    pub depends_on: Vec<String>,
}

fn default_units_per_station() -> u32 {
    1
}

fn default_min_units_to_start() -> u32 {
    1
}

impl ProductionStep {
    /// 判断是否为起始工序 (无前置依赖)
    pub fn is_root(&self) -> bool {
        self.depends_on.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_order_effective_priority_starts_at_base() {
        let po = PurchaseOrder::new(
            "PO-101",
            NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
            90,
            75_000.0,
            20,
        );
        assert_eq!(po.effective_priority, 90.0);
    }

    #[test]
    fn test_step_defaults_from_json() {
        let step: ProductionStep = serde_json::from_str(
            r#"{
                "step_id": "ST-1",
                "purchase_order_id": "PO-101",
                "activity_id": "A1",
                "step_order": 1,
                "duration_days": 0.1,
                "setup_time_days": 0.0,
                "teardown_time_days": 0.0
            }"#,
        )
        .unwrap();
        assert_eq!(step.units_per_station, 1);
        assert_eq!(step.min_units_to_start, 1);
        assert!(step.is_root());
    }
}
