// ==========================================
// 课程完成度跟踪 - 引擎层
// ==========================================
// 职责: 准入扫描（只读）+ 完成度记录写入（两阶段）
// 红线: Engine 不拼 SQL, 准入判定必须能输出 reason
// ==========================================

pub mod eligibility;
pub mod eligibility_core;
pub mod recorder;

// 重导出核心引擎
pub use eligibility::{
    CandidateStream, EligibilityExplainer, EligibilityExplanation, EligibilityScan,
    EligibilityScanner,
};
pub use eligibility_core::EligibilityCore;
pub use recorder::{RecordOutcome, TrackingRecorder};
