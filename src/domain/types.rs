// ==========================================
// 车间工单排产系统 - 领域类型定义
// ==========================================
// 班次体系: 每日固定 AM/PM 两个班次
// 违规等级: 等级制,不是评分制
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 班次 (Time Slot)
// ==========================================
// 顺序: Am < Pm,用于按时间排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeSlot {
    Am, // 上午班
    Pm, // 下午班
}

impl TimeSlot {
    /// 一天内的全部班次,按时间顺序
    pub const ALL: [TimeSlot; 2] = [TimeSlot::Am, TimeSlot::Pm];

    /// 转换为字符串标识
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::Am => "AM",
            TimeSlot::Pm => "PM",
        }
    }

    /// 从字符串解析班次
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "AM" => Some(TimeSlot::Am),
            "PM" => Some(TimeSlot::Pm),
            _ => None,
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 违规严重等级 (Severity)
// ==========================================
// 顺序: Medium < High
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Medium, // 中等: 少量可容忍
    High,   // 高: 一票否决
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_slot_ordering() {
        assert!(TimeSlot::Am < TimeSlot::Pm);
        assert_eq!(TimeSlot::ALL, [TimeSlot::Am, TimeSlot::Pm]);
    }

    #[test]
    fn test_time_slot_parse() {
        assert_eq!(TimeSlot::parse("AM"), Some(TimeSlot::Am));
        assert_eq!(TimeSlot::parse("pm"), Some(TimeSlot::Pm));
        assert_eq!(TimeSlot::parse("NOON"), None);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Medium < Severity::High);
    }
}
