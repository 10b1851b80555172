// ==========================================
// 课程完成度跟踪 - 选课相关领域模型
// ==========================================
// 所有者: 外部选课/课程/角色子系统
// 本模块只读，不负责这些实体的生命周期
// ==========================================

use crate::domain::types::{CourseId, EnrolmentStatus, MethodStatus, RoleId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

// ==========================================
// EnrollmentRecord - 学员经某一选课方式的选课记录
// ==========================================
// 对齐: enrol JOIN user_enrolments
// 同一 (course_id, user_id) 可以有多条，每种选课方式一条
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub enrol_id: i64,                          // 选课方式实例 ID
    pub method: String,                         // 选课插件名 (manual / self / ...)
    pub method_status: MethodStatus,
    pub user_enrolment_status: EnrolmentStatus,
    pub time_start: Timestamp,                  // 0 = 立即生效
    pub time_end: Timestamp,                    // 0 = 不过期
}

// ==========================================
// CourseRecord - 课程
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub course_id: CourseId,
    pub fullname: String,
    pub completion_enabled: bool,
}

// ==========================================
// RoleAssignment - 课程级角色分配
// ==========================================
// 仅作为过滤条件使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub role_id: RoleId,
}
