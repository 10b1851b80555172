// ==========================================
// 课程完成度跟踪 - 配置层
// ==========================================
// 职责: 任务配置的读取与显式传递
// 存储: config_kv 表
// ==========================================

pub mod completion_config;
pub mod completion_config_trait;
pub mod config_manager;

// 重导出核心配置类型
pub use completion_config::{CompletionConfig, RoleFilter};
pub use completion_config_trait::{CompletionConfigReader, ConfigError};
pub use config_manager::{config_keys, ConfigManager};
