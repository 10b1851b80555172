// ==========================================
// 课程完成度跟踪 - 完成度记录仓储
// ==========================================
// 对齐: course_completions 表, UNIQUE(user_id, course)
// 红线: Repository 不含业务逻辑
// ==========================================
// 两种访问方式:
// - CourseCompletionRepository: 持有共享连接，供查询/运维使用
// - SqliteCompletionStore: 借用调用方已持有的连接，供批处理在同一把锁内写入
// ==========================================

use crate::domain::completion::{CompletionTrackingRecord, NewCompletionRecord};
use crate::domain::types::{CourseId, UserId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// CompletionRecordStore - 写入阶段所需的最小接口
// ==========================================
pub trait CompletionRecordStore {
    /// (course, user) 是否已有完成度记录
    fn exists(&self, course_id: CourseId, user_id: UserId) -> RepositoryResult<bool>;

    /// 插入一条完成度记录，返回新记录 ID
    ///
    /// 唯一约束冲突返回 `RepositoryError::UniqueConstraintViolation`
    fn insert(&self, record: &NewCompletionRecord) -> RepositoryResult<i64>;
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, course, user_id, time_enrolled, time_started, time_completed, reaggregate
    FROM course_completions
"#;

fn map_record(row: &Row<'_>) -> rusqlite::Result<CompletionTrackingRecord> {
    Ok(CompletionTrackingRecord {
        id: row.get(0)?,
        course_id: row.get(1)?,
        user_id: row.get(2)?,
        time_enrolled: row.get(3)?,
        time_started: row.get(4)?,
        time_completed: row.get(5)?,
        reaggregate: row.get(6)?,
    })
}

fn exists_on(conn: &Connection, course_id: CourseId, user_id: UserId) -> RepositoryResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM course_completions WHERE course = ?1 AND user_id = ?2 LIMIT 1",
            params![course_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn insert_on(conn: &Connection, record: &NewCompletionRecord) -> RepositoryResult<i64> {
    conn.execute(
        r#"
        INSERT INTO course_completions (
            course, user_id, time_enrolled, time_started, reaggregate
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            record.course_id,
            record.user_id,
            record.time_enrolled,
            record.time_started,
            record.reaggregate,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

// ==========================================
// SqliteCompletionStore - 借用连接的写入实现
// ==========================================
pub struct SqliteCompletionStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCompletionStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl CompletionRecordStore for SqliteCompletionStore<'_> {
    fn exists(&self, course_id: CourseId, user_id: UserId) -> RepositoryResult<bool> {
        exists_on(self.conn, course_id, user_id)
    }

    fn insert(&self, record: &NewCompletionRecord) -> RepositoryResult<i64> {
        insert_on(self.conn, record)
    }
}

// ==========================================
// CourseCompletionRepository - 完成度记录仓储
// ==========================================
pub struct CourseCompletionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CourseCompletionRepository {
    /// 创建新的完成度记录仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按 (course, user) 查询
    pub fn find(
        &self,
        course_id: CourseId,
        user_id: UserId,
    ) -> RepositoryResult<Option<CompletionTrackingRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE course = ?1 AND user_id = ?2", SELECT_COLUMNS);
        let record = conn
            .query_row(&sql, params![course_id, user_id], map_record)
            .optional()?;
        Ok(record)
    }

    /// 列出课程下的全部完成度记录（按 user_id 升序）
    pub fn list_by_course(&self, course_id: CourseId) -> RepositoryResult<Vec<CompletionTrackingRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE course = ?1 ORDER BY user_id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![course_id], map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 完成度记录总数
    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM course_completions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// 插入单条记录（独立加锁，不用于批处理）
    pub fn insert(&self, record: &NewCompletionRecord) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        insert_on(&conn, record)
    }
}
