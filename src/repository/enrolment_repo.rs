// ==========================================
// 课程完成度跟踪 - 选课数据只读仓储
// ==========================================
// 对齐: course / enrol / user_enrolments / role_assignments 表
// 红线: 这些表归外部子系统所有，本仓储只读
// ==========================================

use crate::domain::enrolment::{CourseRecord, EnrollmentRecord, RoleAssignment};
use crate::domain::types::{CourseId, EnrolmentStatus, MethodStatus, UserId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// EnrolmentRepository - 选课只读仓储
// ==========================================
pub struct EnrolmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EnrolmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询课程
    pub fn find_course(&self, course_id: CourseId) -> RepositoryResult<Option<CourseRecord>> {
        let conn = self.get_conn()?;
        let course = conn
            .query_row(
                "SELECT id, fullname, enable_completion FROM course WHERE id = ?1",
                params![course_id],
                |row| {
                    Ok(CourseRecord {
                        course_id: row.get(0)?,
                        fullname: row.get(1)?,
                        completion_enabled: row.get::<_, i64>(2)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(course)
    }

    /// 列出学员在课程中的全部选课记录（每种选课方式一条）
    ///
    /// 不做任何有效性过滤，按 enrol_id 升序
    pub fn list_for_user(
        &self,
        course_id: CourseId,
        user_id: UserId,
    ) -> RepositoryResult<Vec<EnrollmentRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT e.course_id, ue.user_id, e.id, e.enrol, e.status,
                   ue.status, ue.time_start, ue.time_end
            FROM user_enrolments ue
            INNER JOIN enrol e ON e.id = ue.enrol_id
            WHERE e.course_id = ?1 AND ue.user_id = ?2
            ORDER BY e.id
            "#,
        )?;

        let records = stmt
            .query_map(params![course_id, user_id], |row| {
                Ok(EnrollmentRecord {
                    course_id: row.get(0)?,
                    user_id: row.get(1)?,
                    enrol_id: row.get(2)?,
                    method: row.get(3)?,
                    method_status: MethodStatus::from_i64(row.get(4)?),
                    user_enrolment_status: EnrolmentStatus::from_i64(row.get(5)?),
                    time_start: row.get(6)?,
                    time_end: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// 列出学员在课程中的角色分配
    pub fn list_role_assignments(
        &self,
        course_id: CourseId,
        user_id: UserId,
    ) -> RepositoryResult<Vec<RoleAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT user_id, course_id, role_id FROM role_assignments \
             WHERE course_id = ?1 AND user_id = ?2 ORDER BY role_id",
        )?;

        let assignments = stmt
            .query_map(params![course_id, user_id], |row| {
                Ok(RoleAssignment {
                    user_id: row.get(0)?,
                    course_id: row.get(1)?,
                    role_id: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO course (id, fullname, enable_completion) VALUES (1, 'Course 1', 1);
            INSERT INTO enrol (id, course_id, enrol, status) VALUES (10, 1, 'manual', 0);
            INSERT INTO enrol (id, course_id, enrol, status) VALUES (11, 1, 'self', 1);
            INSERT INTO user_enrolments (enrol_id, user_id, status, time_start, time_end)
                VALUES (10, 7, 0, 100, 0);
            INSERT INTO user_enrolments (enrol_id, user_id, status, time_start, time_end)
                VALUES (11, 7, 1, 50, 500);
            INSERT INTO role (id, shortname) VALUES (5, 'student');
            INSERT INTO role_assignments (role_id, course_id, user_id) VALUES (5, 1, 7);
            "#,
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn test_find_course() {
        let repo = EnrolmentRepository::new(setup_test_db());

        let course = repo.find_course(1).unwrap().unwrap();
        assert!(course.completion_enabled);
        assert_eq!(course.fullname, "Course 1");
        assert!(repo.find_course(2).unwrap().is_none());
    }

    #[test]
    fn test_list_for_user_joins_method() {
        let repo = EnrolmentRepository::new(setup_test_db());

        let records = repo.list_for_user(1, 7).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].method, "manual");
        assert_eq!(records[0].method_status, MethodStatus::Enabled);
        assert_eq!(records[0].user_enrolment_status, EnrolmentStatus::Active);

        assert_eq!(records[1].method, "self");
        assert_eq!(records[1].method_status, MethodStatus::Disabled);
        assert_eq!(records[1].user_enrolment_status, EnrolmentStatus::Suspended);
        assert_eq!(records[1].time_end, 500);
    }

    #[test]
    fn test_list_role_assignments() {
        let repo = EnrolmentRepository::new(setup_test_db());

        let roles = repo.list_role_assignments(1, 7).unwrap();
        assert_eq!(roles, vec![RoleAssignment { user_id: 7, course_id: 1, role_id: 5 }]);
        assert!(repo.list_role_assignments(1, 8).unwrap().is_empty());
    }
}
