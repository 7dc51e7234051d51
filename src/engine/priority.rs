// ==========================================
// 车间工单排产系统 - 优先级引擎
// ==========================================
// 职责: 由交付期、合同价值、基础优先级推导工单有效优先级
// 输入: 工单列表 + 当前日期
// 输出: 更新后的 effective_priority (夹在 [1,100])
// 红线: 纯函数,相同输入重复调用结果不变
// ==========================================

use crate::domain::PurchaseOrder;
use chrono::NaiveDate;
use tracing::{debug, instrument};

// ==========================================
// PriorityScorer - 优先级引擎
// ==========================================
pub struct PriorityScorer {
    // 无状态引擎,不需要注入依赖
}

impl PriorityScorer {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 重算全部工单的有效优先级
    ///
    /// 公式:
    /// effective = clamp(1, 100,
    ///     base_priority + (20 - 2 * days_until_due) + 15 * value / max_value)
    ///
    /// - 交付期因子: 越临近 (或已逾期) 加分越多,范围随天数线性变化
    /// - 价值因子: 按全部工单中的最大价值归一化,最高 15 分
    ///
    /// # 参数
    /// - `orders`: 工单列表 (就地更新 effective_priority)
    /// - `today`: 当前日期 (显式传入,保证可测试、可重放)
    #[instrument(skip(self, orders), fields(orders_count = orders.len(), today = %today))]
    pub fn update_priorities(&self, orders: &mut [PurchaseOrder], today: NaiveDate) {
        // 全部工单中的最大合同价值,用于价值因子归一化
        let max_value = orders
            .iter()
            .map(|po| po.value)
            .fold(0.0_f64, |acc, v| if v.is_finite() { acc.max(v) } else { acc });

        for po in orders.iter_mut() {
            let days_until_due = (po.due_date - today).num_days();
            let deadline_score = 20.0 - (days_until_due as f64) * 2.0;

            let value_score = if max_value > 0.0 && po.value.is_finite() {
                (po.value / max_value) * 15.0
            } else {
                0.0
            };

            let raw = po.base_priority as f64 + deadline_score + value_score;
            po.effective_priority = raw.clamp(1.0, 100.0);

            debug!(
                po_id = %po.id,
                base_priority = po.base_priority,
                days_until_due,
                deadline_score,
                value_score,
                effective_priority = po.effective_priority,
                "工单优先级已更新"
            );
        }
    }
}

impl Default for PriorityScorer {
    fn default() -> Self {
        Self::new()
    }
}
