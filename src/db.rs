// ==========================================
// 课程完成度跟踪 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供幂等的建表入口（选课/角色表由外部子系统维护，这里仅保证存在）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "COMPLETION_TRACKER_DB_PATH";

/// 获取默认数据库路径
///
/// 优先级: 环境变量 COMPLETION_TRACKER_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./completion_tracker.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("completion-tracker");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("completion_tracker.db");
        }
    }

    path.to_string_lossy().to_string()
}

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    crate::perf::install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// 初始化数据库 schema（幂等）
///
/// 表清单：
/// - course / enrol / user_enrolments / role / role_assignments: 外部子系统的只读数据
/// - course_completions: 本任务唯一写入的表，(user_id, course) 唯一
/// - config_kv: 全局配置
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS course (
            id INTEGER PRIMARY KEY,
            fullname TEXT NOT NULL DEFAULT '',
            enable_completion INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS enrol (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
            enrol TEXT NOT NULL,
            status INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_enrol_course ON enrol(course_id);

        CREATE TABLE IF NOT EXISTS user_enrolments (
            id INTEGER PRIMARY KEY,
            enrol_id INTEGER NOT NULL REFERENCES enrol(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL,
            status INTEGER NOT NULL DEFAULT 0,
            time_start INTEGER NOT NULL DEFAULT 0,
            time_end INTEGER NOT NULL DEFAULT 0,
            UNIQUE (enrol_id, user_id)
        );
        CREATE INDEX IF NOT EXISTS idx_user_enrolments_user ON user_enrolments(user_id);

        CREATE TABLE IF NOT EXISTS role (
            id INTEGER PRIMARY KEY,
            shortname TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS role_assignments (
            id INTEGER PRIMARY KEY,
            role_id INTEGER NOT NULL REFERENCES role(id),
            course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL,
            UNIQUE (role_id, course_id, user_id)
        );
        CREATE INDEX IF NOT EXISTS idx_role_assignments_course_user
            ON role_assignments(course_id, user_id);

        CREATE TABLE IF NOT EXISTS course_completions (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            course INTEGER NOT NULL,
            time_enrolled INTEGER NOT NULL DEFAULT 0,
            time_started INTEGER NOT NULL DEFAULT 0,
            time_completed INTEGER,
            reaggregate INTEGER NOT NULL DEFAULT 0,
            UNIQUE (user_id, course)
        );
        CREATE INDEX IF NOT EXISTS idx_course_completions_course ON course_completions(course);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_course_completions_unique_per_pair() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO course_completions (user_id, course, time_enrolled) VALUES (1, 1, 100)",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO course_completions (user_id, course, time_enrolled) VALUES (1, 1, 200)",
            [],
        );

        assert!(dup.is_err());
    }
}
