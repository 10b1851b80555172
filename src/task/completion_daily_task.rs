// ==========================================
// 课程完成度跟踪 - 每日完成度任务
// ==========================================
// 流程: 配置开关 → 准入扫描（只读、流式）→ 逐条写入完成度记录
// 幂等: 已有完成度记录的 (course, user) 不会再被扫描到
// 并发: 不加进程内锁，重复记录由 course_completions 唯一索引兜底
// ==========================================

use crate::config::{CompletionConfig, CompletionConfigReader};
use crate::domain::completion::RecordReport;
use crate::domain::types::Timestamp;
use crate::engine::{EligibilityScanner, TrackingRecorder};
use crate::i18n;
use crate::perf::{PerfGuard, PerfStats};
use crate::repository::{RepositoryError, SqliteCompletionStore};
use crate::task::{ScheduledTask, TaskError};
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

/// 单次执行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskOutcome {
    /// 站点未启用完成度，未做任何事
    Disabled,
    /// 已完成一次扫描与写入
    Completed { report: RecordReport, perf: PerfStats },
}

impl TaskOutcome {
    pub fn report(&self) -> Option<&RecordReport> {
        match self {
            TaskOutcome::Disabled => None,
            TaskOutcome::Completed { report, .. } => Some(report),
        }
    }
}

// ==========================================
// CompletionDailyTask - 每日完成度任务
// ==========================================
pub struct CompletionDailyTask {
    conn: Arc<Mutex<Connection>>,
    config: CompletionConfig,
}

impl CompletionDailyTask {
    /// 以显式配置创建任务
    pub fn new(conn: Arc<Mutex<Connection>>, config: CompletionConfig) -> Self {
        Self { conn, config }
    }

    /// 从配置读取器加载配置后创建任务
    pub async fn from_reader<R>(conn: Arc<Mutex<Connection>>, reader: &R) -> Result<Self, TaskError>
    where
        R: CompletionConfigReader + ?Sized,
    {
        let config = reader.load_completion_config().await?;
        Ok(Self::new(conn, config))
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// 以给定时间执行一次
    ///
    /// # 返回
    /// - Ok(TaskOutcome::Disabled): 完成度关闭
    /// - Ok(TaskOutcome::Completed): 扫描完成（单条写入失败在 report.failed 中）
    /// - Err: 读阶段失败，整次执行作废，等待下次调度
    #[instrument(skip(self))]
    pub fn run_at(&self, now: Timestamp) -> Result<TaskOutcome, TaskError> {
        if !self.config.completion_enabled {
            debug!("{}", i18n::t("task.completion_disabled"));
            return Ok(TaskOutcome::Disabled);
        }

        debug!("{}", i18n::t("task.marking_started"));

        let perf = PerfGuard::new("completion_daily.update_completions");
        let report = self.update_completions(now)?;
        let perf = perf.finish();

        let summary = i18n::t_with_args(
            "task.summary",
            &[
                ("created", &report.created.to_string()),
                ("skipped", &report.skipped.to_string()),
                ("failed", &report.failed.len().to_string()),
            ],
        );
        if report.has_failures() {
            warn!(failed = report.failed.len(), "{}", summary);
        } else {
            info!(created = report.created, skipped = report.skipped, "{}", summary);
        }

        Ok(TaskOutcome::Completed { report, perf })
    }

    /// 扫描并补建缺失的完成度记录
    ///
    /// 扫描游标与写入共用同一连接，整个过程持有一次连接锁
    ///
    /// 游标读取期间本连接会写入 course_completions，游标能否看到新行不确定；
    /// 不重复写入依赖 TrackingRecorder 的写前复查与 UNIQUE(user_id, course)
    fn update_completions(&self, now: Timestamp) -> Result<RecordReport, TaskError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let scanner = EligibilityScanner::new(&conn);
        let recorder = TrackingRecorder::new(SqliteCompletionStore::new(&conn));

        let mut scan = scanner.scan(now, &self.config.role_filter)?;
        let report = recorder.record(scan.candidates()?, now)?;

        Ok(report)
    }
}

impl ScheduledTask for CompletionDailyTask {
    fn name(&self) -> String {
        i18n::t("task.completion_daily")
    }

    fn execute(&self) -> Result<(), TaskError> {
        self.run_at(Utc::now().timestamp()).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoleFilter;

    const NOW: Timestamp = 1_700_000_000;
    const DAY: Timestamp = 86_400;

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO course (id, enable_completion) VALUES (1, 1);
            INSERT INTO enrol (id, course_id, enrol, status) VALUES (10, 1, 'manual', 0);
            INSERT INTO role (id, shortname) VALUES (5, 'student');
            INSERT INTO role_assignments (role_id, course_id, user_id) VALUES (5, 1, 7);
            "#,
        )
        .unwrap();
        conn.execute(
            "INSERT INTO user_enrolments (enrol_id, user_id, time_start) VALUES (10, 7, ?1)",
            [NOW - DAY],
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn count(conn: &Arc<Mutex<Connection>>) -> i64 {
        conn.lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM course_completions", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_disabled_config_is_noop() {
        let conn = setup_test_db();
        let task = CompletionDailyTask::new(conn.clone(), CompletionConfig::default());

        assert_eq!(task.run_at(NOW).unwrap(), TaskOutcome::Disabled);
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn test_run_twice_is_idempotent() {
        let conn = setup_test_db();
        let task = CompletionDailyTask::new(conn.clone(), CompletionConfig::enabled());

        let first = task.run_at(NOW).unwrap();
        assert_eq!(first.report().unwrap().created, 1);

        let second = task.run_at(NOW + 60).unwrap();
        assert_eq!(second.report().unwrap().processed(), 0);
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn test_read_failure_propagates() {
        let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
        let task = CompletionDailyTask::new(conn, CompletionConfig::new(true, RoleFilter::unrestricted()));

        let err = task.run_at(NOW).unwrap_err();
        assert!(matches!(err, TaskError::Repository(_)));
    }

    #[test]
    fn test_execute_uses_wall_clock() {
        let conn = setup_test_db();
        let task = CompletionDailyTask::new(conn.clone(), CompletionConfig::enabled());

        task.execute().unwrap();
        assert_eq!(count(&conn), 1);
        assert!(!task.name().is_empty());
    }
}
