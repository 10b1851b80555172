// ==========================================
// 课程完成度跟踪 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod course_completion_repo;
pub mod eligibility_repo;
pub mod enrolment_repo;
pub mod error;
pub mod sql_builder;

// 重导出核心仓储
pub use course_completion_repo::{
    CompletionRecordStore, CourseCompletionRepository, SqliteCompletionStore,
};
pub use eligibility_repo::{EligibilityCursor, EligibilityRow, EligibilityRows};
pub use enrolment_repo::EnrolmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use sql_builder::SqlQueryBuilder;
