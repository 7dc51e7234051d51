// ==========================================
// 车间工单排产系统 - 核心库
// ==========================================
// 系统定位: 多工序工单排产引擎 (依赖有序、按件分割)
// 技术栈: Rust + tokio
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 排产规则
pub mod engine;

// 外部协作者接口 - 改进建议提供方
pub mod proposer;

// 外部协作者接口 - 解说文本
pub mod narrative;

// 配置层 - 排产参数
pub mod config;

// 错误类型
pub mod error;

// 日志系统
pub mod logging;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "车间工单排产系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
