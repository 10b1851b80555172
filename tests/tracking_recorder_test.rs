// ==========================================
// 完成度记录写入 - 并发竞争测试
// ==========================================
// 扫描与写入之间，另一任务抢先写入同一 (course, user):
// - 写前复查命中 → skipped
// - 复查未命中但唯一索引冲突 → skipped
// 两种情况都不产生重复记录，也不计入 failed
// ==========================================


use completion_tracker::domain::completion::NewCompletionRecord;
use completion_tracker::domain::types::{CourseId, UserId};
use completion_tracker::engine::{EligibilityScanner, RecordOutcome, TrackingRecorder};
use completion_tracker::repository::{
    CompletionRecordStore, CourseCompletionRepository, RepositoryResult, SqliteCompletionStore,
};
use completion_tracker::task::CompletionDailyTask;
use completion_tracker::{CompletionCandidate, CompletionConfig, RoleFilter};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use test_helpers::*;

const NOW: i64 = 1_700_000_000;

/// 跳过写前复查的存储，用于直接触发唯一索引
struct NoRecheckStore<'c> {
    inner: SqliteCompletionStore<'c>,
}

impl CompletionRecordStore for NoRecheckStore<'_> {
    fn exists(&self, _course_id: CourseId, _user_id: UserId) -> RepositoryResult<bool> {
        Ok(false)
    }

    fn insert(&self, record: &NewCompletionRecord) -> RepositoryResult<i64> {
        self.inner.insert(record)
    }
}

fn seed(conn: &Connection) -> i64 {
    let course = create_course(conn, "race", true).unwrap();
    for user in 1..=3 {
        Enrolment::new(course, user)
            .window(NOW - user * DAYSECS, 0)
            .insert(conn)
            .unwrap();
    }
    course
}

fn scan_all(conn: &Arc<Mutex<Connection>>) -> Vec<CompletionCandidate> {
    let guard = conn.lock().unwrap();
    let scanner = EligibilityScanner::new(&guard);
    let mut scan = scanner.scan(NOW, &RoleFilter::unrestricted()).unwrap();
    let candidates = scan.candidates().unwrap().collect::<Result<Vec<_>, _>>().unwrap();
    candidates
}

#[test]
fn test_concurrent_write_after_scan_is_skipped() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let conn = open_shared_connection(&db_path).unwrap();
    let course = seed(&conn.lock().unwrap());

    let candidates = scan_all(&conn);
    assert_eq!(candidates.len(), 3);

    // 另一任务在扫描之后完成了整轮写入
    let other = CompletionDailyTask::new(open_shared_connection(&db_path).unwrap(), CompletionConfig::enabled());
    assert_eq!(other.run_at(NOW).unwrap().report().unwrap().created, 3);

    let guard = conn.lock().unwrap();
    let recorder = TrackingRecorder::new(SqliteCompletionStore::new(&guard));
    let report = recorder.record(candidates.into_iter().map(Ok), NOW).unwrap();

    assert_eq!(report.created, 0);
    assert_eq!(report.skipped, 3);
    assert!(report.failed.is_empty());
    assert_eq!(count_completions(&guard).unwrap(), 3);
    assert_eq!(time_enrolled(&guard, course, 2).unwrap(), Some(NOW - 2 * DAYSECS));
}

#[test]
fn test_unique_index_conflict_is_skipped() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let conn = open_shared_connection(&db_path).unwrap();
    let course = seed(&conn.lock().unwrap());

    let candidates = scan_all(&conn);
    insert_completion(&conn.lock().unwrap(), course, 1, NOW - 99 * DAYSECS).unwrap();

    let guard = conn.lock().unwrap();
    let recorder = TrackingRecorder::new(NoRecheckStore {
        inner: SqliteCompletionStore::new(&guard),
    });

    assert_eq!(recorder.record_one(&candidates[0], NOW), RecordOutcome::Skipped);

    let report = recorder.record(candidates[1..].iter().copied().map(Ok), NOW).unwrap();
    assert_eq!(report.created, 2);
    assert!(report.failed.is_empty());

    // 抢先写入的记录保持原值
    assert_eq!(time_enrolled(&guard, course, 1).unwrap(), Some(NOW - 99 * DAYSECS));
    assert_eq!(count_completions(&guard).unwrap(), 3);
}

#[test]
fn test_recorded_rows_visible_through_repository() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let conn = open_shared_connection(&db_path).unwrap();
    let course = seed(&conn.lock().unwrap());

    let candidates = scan_all(&conn);
    {
        let guard = conn.lock().unwrap();
        let recorder = TrackingRecorder::new(SqliteCompletionStore::new(&guard));
        let report = recorder.record(candidates.into_iter().map(Ok), NOW).unwrap();
        assert_eq!(report.created, 3);
    }

    let repo = CourseCompletionRepository::new(conn);
    assert_eq!(repo.count_all().unwrap(), 3);

    let record = repo.find(course, 3).unwrap().unwrap();
    assert_eq!(record.time_enrolled, NOW - 3 * DAYSECS);
    assert_eq!(record.time_started, 0);
    assert_eq!(record.reaggregate, NOW);
}
