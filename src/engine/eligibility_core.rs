// ==========================================
// 课程完成度跟踪 - Eligibility Core 纯函数库
// ==========================================
// 职责: 当前有效选课判定、开始时间聚合、单对 (course, user) 准入判定
// 红线: 无状态、无副作用、无 I/O 操作
// 说明: 与 eligibility_repo 的 SQL 谓词逐条对应，SQL 负责批量，这里负责单对解释
// ==========================================

use crate::config::RoleFilter;
use crate::domain::completion::CompletionCandidate;
use crate::domain::enrolment::{CourseRecord, EnrollmentRecord};
use crate::domain::types::{EnrolmentStatus, MethodStatus, RoleId, Timestamp, UserId};

// ==========================================
// EligibilityCore - 纯函数工具类
// ==========================================
pub struct EligibilityCore;

impl EligibilityCore {
    /// 选课记录当前是否有效
    ///
    /// # 规则
    /// - 学员选课状态正常，且选课方式启用
    /// - time_start < now（0 表示立即生效，同样满足）
    /// - time_end > now，或 time_end = 0（不过期）
    pub fn is_currently_active(record: &EnrollmentRecord, now: Timestamp) -> bool {
        record.user_enrolment_status == EnrolmentStatus::Active
            && record.method_status == MethodStatus::Enabled
            && record.time_start < now
            && (record.time_end > now || record.time_end == 0)
    }

    /// 由“最小非 0 开始时间”得出候选开始时间
    ///
    /// # 规则
    /// - Some(t) → t
    /// - None（有效记录的 time_start 全为 0）→ now
    pub fn resolve_candidate_start(earliest_start: Option<Timestamp>, now: Timestamp) -> Timestamp {
        earliest_start.unwrap_or(now)
    }

    /// 在同一 (course, user) 的全部选课记录上聚合候选开始时间
    ///
    /// # 返回
    /// - None: 没有任何当前有效的选课记录
    /// - Some(t): 有效记录中最小的非 0 time_start，全为 0 时为 now
    pub fn aggregate_candidate_start(records: &[EnrollmentRecord], now: Timestamp) -> Option<Timestamp> {
        let mut any_active = false;
        let mut earliest: Option<Timestamp> = None;

        for record in records.iter().filter(|r| Self::is_currently_active(r, now)) {
            any_active = true;
            if record.time_start != 0 {
                earliest = Some(earliest.map_or(record.time_start, |e| e.min(record.time_start)));
            }
        }

        any_active.then(|| Self::resolve_candidate_start(earliest, now))
    }

    /// 单对 (course, user) 的准入判定
    ///
    /// # 参数
    /// - course: 课程
    /// - user_id: 学员
    /// - records: 该学员在该课程的全部选课记录
    /// - held_roles: 该学员在该课程持有的角色
    /// - already_tracked: 是否已存在完成度记录
    /// - role_filter: 可计分角色过滤
    /// - now: 当前时间
    ///
    /// # 返回
    /// - (Option<CompletionCandidate>, Vec<String>): 候选项（不准入时为 None）与判定原因
    pub fn evaluate_pair(
        course: &CourseRecord,
        user_id: UserId,
        records: &[EnrollmentRecord],
        held_roles: &[RoleId],
        already_tracked: bool,
        role_filter: &RoleFilter,
        now: Timestamp,
    ) -> (Option<CompletionCandidate>, Vec<String>) {
        let mut reasons = Vec::new();

        if !course.completion_enabled {
            reasons.push(format!("SKIP: completion disabled for course {}", course.course_id));
            return (None, reasons);
        }

        if already_tracked {
            reasons.push("SKIP: completion record already exists".to_string());
            return (None, reasons);
        }

        for record in records {
            if !Self::is_currently_active(record, now) {
                reasons.push(format!(
                    "IGNORE: enrol_id={} ({}) not current: method={} status={} window=[{}, {}]",
                    record.enrol_id,
                    record.method,
                    record.method_status,
                    record.user_enrolment_status,
                    record.time_start,
                    record.time_end,
                ));
            }
        }

        if held_roles.is_empty() {
            reasons.push(format!("SKIP: no role assignment in course {}", course.course_id));
            return (None, reasons);
        }

        if !role_filter.admits(held_roles.iter().copied()) {
            reasons.push(format!(
                "SKIP: no gradebook role held (held={:?}, allowed={:?})",
                held_roles,
                role_filter.role_ids()
            ));
            return (None, reasons);
        }

        let Some(candidate_start) = Self::aggregate_candidate_start(records, now) else {
            reasons.push("SKIP: no currently active enrolment".to_string());
            return (None, reasons);
        };

        reasons.push(format!("ELIGIBLE: candidate_start={}", candidate_start));

        (
            Some(CompletionCandidate {
                course_id: course.course_id,
                user_id,
                candidate_start,
            }),
            reasons,
        )
    }
}
