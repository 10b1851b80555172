// ==========================================
// 课程完成度跟踪 - 核心库
// ==========================================
// 职责: 为开启完成度的课程补建学员完成度记录，
//       time_enrolled 取所有当前有效选课方式中最早的开始时间
// 技术栈: Rust + SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 准入扫描与写入
pub mod engine;

// 配置层 - 任务配置
pub mod config;

// 任务层 - 调度器接口
pub mod task;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// SQL 诊断
pub mod perf;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{CompletionConfig, ConfigManager, RoleFilter};
pub use domain::{
    CompletionCandidate, CompletionTrackingRecord, CoursePair, EnrollmentRecord, RecordFailure,
    RecordReport,
};
pub use engine::{EligibilityCore, EligibilityExplainer, EligibilityScanner, TrackingRecorder};
pub use task::{CompletionDailyTask, ScheduledTask, TaskError, TaskOutcome};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
