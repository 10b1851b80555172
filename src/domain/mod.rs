// ==========================================
// 课程完成度跟踪 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod completion;
pub mod enrolment;
pub mod types;

// 重导出核心类型
pub use completion::{
    CompletionCandidate, CompletionTrackingRecord, CoursePair, NewCompletionRecord, RecordFailure,
    RecordReport,
};
pub use enrolment::{CourseRecord, EnrollmentRecord, RoleAssignment};
pub use types::{CourseId, EnrolmentStatus, MethodStatus, RoleId, Timestamp, UserId};
