// ==========================================
// 课程完成度跟踪 - 准入扫描查询
// ==========================================
// 职责: 一次查询完成全部过滤与按 (course, user) 分组聚合
// 输出: 逐行游标，不整体物化
// 约束: now / 状态值 / 角色 ID 全部通过绑定参数传入
// ==========================================

use crate::domain::types::{CourseId, EnrolmentStatus, MethodStatus, RoleId, Timestamp, UserId};
use crate::repository::error::RepositoryResult;
use crate::repository::sql_builder::SqlQueryBuilder;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row, Rows, Statement};

/// 扫描结果行（尚未应用“全为 0 则取 now”的回退）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityRow {
    pub course_id: CourseId,
    pub user_id: UserId,
    /// 当前有效选课记录中最小的非 0 开始时间；全部为 0 时为 None
    pub earliest_start: Option<Timestamp>,
}

const BASE_SELECT: &str = r#"SELECT c.id, ue.user_id,
       MIN(CASE WHEN ue.time_start <> 0 THEN ue.time_start END)
FROM user_enrolments ue
INNER JOIN enrol e ON e.id = ue.enrol_id
INNER JOIN course c ON c.id = e.course_id
LEFT JOIN course_completions cc ON cc.course = c.id AND cc.user_id = ue.user_id"#;

const ACTIVE_PREDICATE: &str = "c.enable_completion = 1 \
     AND cc.id IS NULL \
     AND ue.status = ? \
     AND e.status = ? \
     AND ue.time_start < ? \
     AND (ue.time_end > ? OR ue.time_end = 0)";

// 学员必须在课程中持有角色；过滤集非空时 `{}` 收窄为 ra.role_id IN (...)
const ROLE_EXISTS_TEMPLATE: &str = "EXISTS (SELECT 1 FROM role_assignments ra \
     WHERE ra.course_id = c.id AND ra.user_id = ue.user_id{})";

/// 构建准入扫描 SQL
///
/// # 规则
/// - 课程开启完成度
/// - (course, user) 尚无完成度记录
/// - 选课记录: 学员状态正常 + 选课方式启用 + time_start < now + (time_end > now 或 time_end = 0)
/// - 学员在该课程持有至少一个角色；role_ids 非空时该角色须在过滤集内
pub fn build_eligibility_query(now: Timestamp, role_ids: &[RoleId]) -> (String, Vec<Value>) {
    SqlQueryBuilder::new(BASE_SELECT)
        .where_clause(
            ACTIVE_PREDICATE,
            [
                EnrolmentStatus::Active.as_i64(),
                MethodStatus::Enabled.as_i64(),
                now,
                now,
            ],
        )
        .and_exists_narrowed(ROLE_EXISTS_TEMPLATE, "ra.role_id", role_ids)
        .group_by("c.id, ue.user_id")
        .order_by("c.id, ue.user_id")
        .build()
}

// ==========================================
// EligibilityCursor - 预编译的扫描语句
// ==========================================
pub struct EligibilityCursor<'c> {
    stmt: Statement<'c>,
    params: Vec<Value>,
}

impl<'c> EligibilityCursor<'c> {
    /// 预编译扫描语句
    pub fn prepare(conn: &'c Connection, now: Timestamp, role_ids: &[RoleId]) -> RepositoryResult<Self> {
        let (sql, params) = build_eligibility_query(now, role_ids);
        let stmt = conn.prepare(&sql)?;
        Ok(Self { stmt, params })
    }

    /// 执行查询，返回逐行迭代器
    pub fn rows(&mut self) -> RepositoryResult<EligibilityRows<'_>> {
        let rows = self.stmt.query(params_from_iter(self.params.iter()))?;
        Ok(EligibilityRows {
            rows,
            finished: false,
        })
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<EligibilityRow> {
    Ok(EligibilityRow {
        course_id: row.get(0)?,
        user_id: row.get(1)?,
        earliest_start: row.get(2)?,
    })
}

// ==========================================
// EligibilityRows - 前向只读行迭代器
// ==========================================
// 出错后产出一次 Err 并终止，不会静默截断
pub struct EligibilityRows<'s> {
    rows: Rows<'s>,
    finished: bool,
}

impl Iterator for EligibilityRows<'_> {
    type Item = RepositoryResult<EligibilityRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mapped = match self.rows.next() {
            Ok(Some(row)) => map_row(row),
            Ok(None) => {
                self.finished = true;
                return None;
            }
            Err(e) => Err(e),
        };

        if mapped.is_err() {
            self.finished = true;
        }
        Some(mapped.map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_without_roles_still_requires_assignment() {
        let (sql, params) = build_eligibility_query(1_000, &[]);
        assert!(sql.contains("EXISTS (SELECT 1 FROM role_assignments ra"));
        assert!(!sql.contains("ra.role_id IN"));
        assert_eq!(
            params,
            vec![
                Value::Integer(0),
                Value::Integer(0),
                Value::Integer(1_000),
                Value::Integer(1_000)
            ]
        );
    }

    #[test]
    fn test_query_binds_role_ids() {
        let (sql, params) = build_eligibility_query(1_000, &[5, 6]);
        assert!(sql.contains("ra.role_id IN (?, ?)"));
        assert!(sql.ends_with("GROUP BY c.id, ue.user_id ORDER BY c.id, ue.user_id"));
        assert_eq!(params.len(), 6);
        assert_eq!(params[4], Value::Integer(5));
    }

    #[test]
    fn test_cursor_reports_missing_tables() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(EligibilityCursor::prepare(&conn, 1_000, &[]).is_err());
    }

    #[test]
    fn test_cursor_groups_and_keeps_zero_as_none() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO course (id, enable_completion) VALUES (1, 1);
            INSERT INTO enrol (id, course_id, enrol, status) VALUES (10, 1, 'manual', 0);
            INSERT INTO enrol (id, course_id, enrol, status) VALUES (11, 1, 'self', 0);
            INSERT INTO user_enrolments (enrol_id, user_id, time_start) VALUES (10, 1, 0);
            INSERT INTO user_enrolments (enrol_id, user_id, time_start) VALUES (10, 2, 0);
            INSERT INTO user_enrolments (enrol_id, user_id, time_start) VALUES (11, 2, 300);
            INSERT INTO user_enrolments (enrol_id, user_id, time_start) VALUES (11, 1, 0);
            INSERT INTO user_enrolments (enrol_id, user_id, time_start) VALUES (10, 3, 0);
            INSERT INTO role (id, shortname) VALUES (5, 'student');
            INSERT INTO role_assignments (role_id, course_id, user_id) VALUES (5, 1, 1);
            INSERT INTO role_assignments (role_id, course_id, user_id) VALUES (5, 1, 2);
            "#,
        )
        .unwrap();

        // 用户 3 没有任何课程角色，不入选
        let mut cursor = EligibilityCursor::prepare(&conn, 1_000, &[]).unwrap();
        let rows: Vec<EligibilityRow> = cursor.rows().unwrap().collect::<Result<_, _>>().unwrap();

        assert_eq!(
            rows,
            vec![
                EligibilityRow { course_id: 1, user_id: 1, earliest_start: None },
                EligibilityRow { course_id: 1, user_id: 2, earliest_start: Some(300) },
            ]
        );
    }
}
