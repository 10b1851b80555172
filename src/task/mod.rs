// ==========================================
// 课程完成度跟踪 - 定时任务层
// ==========================================
// 职责: 向外部调度器暴露 name() / execute()
// 约定: execute() 返回 Err 表示调度器应按自身策略重试，本层不做重试
// ==========================================

pub mod completion_daily_task;

use crate::config::ConfigError;
use crate::repository::RepositoryError;
use thiserror::Error;

pub use completion_daily_task::{CompletionDailyTask, TaskOutcome};

/// 任务执行错误
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("配置读取失败: {0}")]
    Config(#[from] ConfigError),

    #[error("数据访问失败: {0}")]
    Repository(#[from] RepositoryError),
}

// ==========================================
// ScheduledTask - 调度器可见的任务接口
// ==========================================
pub trait ScheduledTask: Send + Sync {
    /// 面向管理员的任务名称（已本地化）
    fn name(&self) -> String;

    /// 执行一次
    fn execute(&self) -> Result<(), TaskError>;
}
