// ==========================================
// 课程完成度跟踪 - 准入扫描引擎
// ==========================================
// 职责: 找出“当前有效选课 + 课程开启完成度 + 尚无完成度记录”的学员，
//       并给出每对 (course, user) 的候选开始时间
// 输入: course / enrol / user_enrolments / role_assignments / course_completions
// 输出: CompletionCandidate 的前向只读流
// 红线: 只读，不写库
// ==========================================

use crate::config::RoleFilter;
use crate::domain::completion::CompletionCandidate;
use crate::domain::types::{CourseId, Timestamp, UserId};
use crate::engine::EligibilityCore;
use crate::repository::{
    CourseCompletionRepository, EligibilityCursor, EligibilityRows, EnrolmentRepository,
    RepositoryResult,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// EligibilityScanner - 准入扫描器
// ==========================================
pub struct EligibilityScanner<'c> {
    conn: &'c Connection,
}

impl<'c> EligibilityScanner<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// 准备一次扫描
    ///
    /// # 参数
    /// - now: 本次扫描的参考时间
    /// - role_filter: 可计分角色过滤（空 = 任意课程角色）
    ///
    /// # 返回
    /// - EligibilityScan: 调用 `candidates()` 获取候选流
    #[instrument(skip(self, role_filter), fields(roles = ?role_filter.role_ids()))]
    pub fn scan(&self, now: Timestamp, role_filter: &RoleFilter) -> RepositoryResult<EligibilityScan<'c>> {
        let cursor = EligibilityCursor::prepare(self.conn, now, &role_filter.role_ids())?;
        Ok(EligibilityScan { cursor, now })
    }
}

/// 已预编译的一次扫描
pub struct EligibilityScan<'c> {
    cursor: EligibilityCursor<'c>,
    now: Timestamp,
}

impl EligibilityScan<'_> {
    /// 执行查询并返回候选流（单次前向遍历）
    pub fn candidates(&mut self) -> RepositoryResult<CandidateStream<'_>> {
        let now = self.now;
        let rows = self.cursor.rows()?;
        Ok(CandidateStream { rows, now })
    }
}

// ==========================================
// CandidateStream - 候选项流
// ==========================================
// 读取失败时产出 Err，消费方必须中止
pub struct CandidateStream<'s> {
    rows: EligibilityRows<'s>,
    now: Timestamp,
}

impl Iterator for CandidateStream<'_> {
    type Item = RepositoryResult<CompletionCandidate>;

    fn next(&mut self) -> Option<Self::Item> {
        let now = self.now;
        self.rows.next().map(|row| {
            row.map(|r| CompletionCandidate {
                course_id: r.course_id,
                user_id: r.user_id,
                candidate_start: EligibilityCore::resolve_candidate_start(r.earliest_start, now),
            })
        })
    }
}

// ==========================================
// EligibilityExplainer - 单对准入解释
// ==========================================
// 用途: 运维排查“为什么某学员没有完成度记录”
pub struct EligibilityExplainer {
    enrolment_repo: Arc<EnrolmentRepository>,
    completion_repo: Arc<CourseCompletionRepository>,
}

/// 单对准入解释结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityExplanation {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub candidate: Option<CompletionCandidate>,
    pub reasons: Vec<String>,
}

impl EligibilityExplainer {
    pub fn new(
        enrolment_repo: Arc<EnrolmentRepository>,
        completion_repo: Arc<CourseCompletionRepository>,
    ) -> Self {
        Self {
            enrolment_repo,
            completion_repo,
        }
    }

    /// 解释某 (course, user) 在 now 时刻的准入结论
    #[instrument(skip(self, role_filter))]
    pub fn explain(
        &self,
        course_id: CourseId,
        user_id: UserId,
        role_filter: &RoleFilter,
        now: Timestamp,
    ) -> RepositoryResult<EligibilityExplanation> {
        let Some(course) = self.enrolment_repo.find_course(course_id)? else {
            return Ok(EligibilityExplanation {
                course_id,
                user_id,
                candidate: None,
                reasons: vec![format!("SKIP: course {} not found", course_id)],
            });
        };

        let records = self.enrolment_repo.list_for_user(course_id, user_id)?;
        let held_roles: Vec<_> = self
            .enrolment_repo
            .list_role_assignments(course_id, user_id)?
            .into_iter()
            .map(|ra| ra.role_id)
            .collect();
        let already_tracked = self.completion_repo.find(course_id, user_id)?.is_some();

        let (candidate, reasons) = EligibilityCore::evaluate_pair(
            &course,
            user_id,
            &records,
            &held_roles,
            already_tracked,
            role_filter,
            now,
        );

        Ok(EligibilityExplanation {
            course_id,
            user_id,
            candidate,
            reasons,
        })
    }
}
