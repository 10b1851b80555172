// ==========================================
// 课程完成度跟踪 - 配置读取 Trait
// ==========================================
// 职责: 定义任务所需的配置读取接口（不包含实现）
// 实现者: ConfigManager（从 config_kv 表读取）
// ==========================================

use crate::config::completion_config::{CompletionConfig, RoleFilter};
use crate::repository::RepositoryError;
use async_trait::async_trait;
use thiserror::Error;

/// 配置读取错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置值无效 (key={key}): {value}")]
    InvalidValue { key: String, value: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// ==========================================
// CompletionConfigReader Trait
// ==========================================
#[async_trait]
pub trait CompletionConfigReader: Send + Sync {
    /// 站点级完成度开关
    ///
    /// # 默认值
    /// - false
    async fn get_completion_enabled(&self) -> Result<bool, ConfigError>;

    /// 可计分角色过滤
    ///
    /// # 默认值
    /// - 空（不限制角色）
    async fn get_gradebook_roles(&self) -> Result<RoleFilter, ConfigError>;

    /// 一次性读取完整任务配置
    async fn load_completion_config(&self) -> Result<CompletionConfig, ConfigError> {
        let completion_enabled = self.get_completion_enabled().await?;
        let role_filter = self.get_gradebook_roles().await?;
        Ok(CompletionConfig::new(completion_enabled, role_filter))
    }
}
