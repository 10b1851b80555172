// ==========================================
// 课程完成度跟踪 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value, scope_id='global')
// ==========================================

use crate::config::completion_config::RoleFilter;
use crate::config::completion_config_trait::{CompletionConfigReader, ConfigError};
use crate::db::open_sqlite_connection;
use crate::domain::types::RoleId;
use crate::repository::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT (scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 获取所有 global 配置的快照（按 key 排序）
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let snapshot = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(snapshot)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }
}

/// 解析布尔开关（"1"/"true"/"yes"/"on" 为真，其余为假）
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

/// 解析逗号分隔的角色 ID 列表
///
/// 任一非空片段无法解析即报错：忽略它会让过滤集变小，
/// 极端情况下变为空集 = 不限制角色
fn parse_role_ids(key: &str, value: &str) -> Result<RoleFilter, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<RoleId>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

#[async_trait]
impl CompletionConfigReader for ConfigManager {
    async fn get_completion_enabled(&self) -> Result<bool, ConfigError> {
        let value = self.get_config_or_default(config_keys::ENABLE_COMPLETION, "0")?;
        Ok(parse_flag(&value))
    }

    async fn get_gradebook_roles(&self) -> Result<RoleFilter, ConfigError> {
        let value = self.get_config_or_default(config_keys::GRADEBOOK_ROLES, "")?;
        parse_role_ids(config_keys::GRADEBOOK_ROLES, &value)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 站点级完成度开关
    pub const ENABLE_COMPLETION: &str = "enablecompletion";

    // 可计分角色（逗号分隔的角色 ID）
    pub const GRADEBOOK_ROLES: &str = "gradebookroles";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_parse_role_ids() {
        let filter = parse_role_ids("gradebookroles", " 5, 6 ,,").unwrap();
        assert_eq!(filter.role_ids(), vec![5, 6]);

        assert!(parse_role_ids("gradebookroles", "").unwrap().is_unrestricted());

        let err = parse_role_ids("gradebookroles", "5,student").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let manager = setup_manager();

        let config = manager.load_completion_config().await.unwrap();
        assert!(!config.completion_enabled);
        assert!(config.role_filter.is_unrestricted());
    }

    #[tokio::test]
    async fn test_reads_and_overrides_values() {
        let manager = setup_manager();
        manager.set_global_config_value(config_keys::ENABLE_COMPLETION, "1").unwrap();
        manager.set_global_config_value(config_keys::GRADEBOOK_ROLES, "5").unwrap();
        manager.set_global_config_value(config_keys::GRADEBOOK_ROLES, "5,7").unwrap();

        let config = manager.load_completion_config().await.unwrap();
        assert!(config.completion_enabled);
        assert_eq!(config.role_filter.role_ids(), vec![5, 7]);

        let snapshot = manager.get_config_snapshot().unwrap();
        assert_eq!(snapshot.get("gradebookroles").map(String::as_str), Some("5,7"));
        assert_eq!(snapshot.len(), 2);
    }
}
