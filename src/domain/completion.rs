// ==========================================
// 课程完成度跟踪 - 完成度记录领域模型
// ==========================================
// 对齐: course_completions 表
// 红线: 每个 (course, user) 至多一条
// ==========================================

use crate::domain::types::{CourseId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// CompletionTrackingRecord - 完成度跟踪记录
// ==========================================
// 本任务只创建，不更新、不删除
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionTrackingRecord {
    pub id: i64,
    pub course_id: CourseId,
    pub user_id: UserId,
    /// 计算出的开始时间
    pub time_enrolled: Timestamp,
    /// 创建时为 0，由下游聚合更新
    pub time_started: Timestamp,
    /// 下游写入
    pub time_completed: Option<Timestamp>,
    /// 重新聚合标记
    pub reaggregate: Timestamp,
}

/// 待插入的完成度记录（尚无主键）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCompletionRecord {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub time_enrolled: Timestamp,
    pub time_started: Timestamp,
    pub reaggregate: Timestamp,
}

impl NewCompletionRecord {
    /// 由候选项生成待插入记录：time_started = 0，reaggregate = now
    pub fn from_candidate(candidate: &CompletionCandidate, now: Timestamp) -> Self {
        Self {
            course_id: candidate.course_id,
            user_id: candidate.user_id,
            time_enrolled: candidate.candidate_start,
            time_started: 0,
            reaggregate: now,
        }
    }
}

// ==========================================
// CompletionCandidate - 扫描产出的候选项（不可变）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionCandidate {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub candidate_start: Timestamp,
}

impl CompletionCandidate {
    pub fn pair(&self) -> CoursePair {
        CoursePair {
            course_id: self.course_id,
            user_id: self.user_id,
        }
    }
}

/// (course, user) 键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoursePair {
    pub course_id: CourseId,
    pub user_id: UserId,
}

impl fmt::Display for CoursePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "course={} user={}", self.course_id, self.user_id)
    }
}

// ==========================================
// RecordReport - 写入阶段汇总
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub created: usize,
    pub skipped: usize,
    pub failed: Vec<RecordFailure>,
}

/// 单条写入失败（不中断批次）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub pair: CoursePair,
    pub cause: String,
}

impl RecordReport {
    /// 已处理的候选项总数
    pub fn processed(&self) -> usize {
        self.created + self.skipped + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_from_candidate() {
        let candidate = CompletionCandidate {
            course_id: 3,
            user_id: 9,
            candidate_start: 1_000,
        };
        let record = NewCompletionRecord::from_candidate(&candidate, 5_000);

        assert_eq!(record.time_enrolled, 1_000);
        assert_eq!(record.time_started, 0);
        assert_eq!(record.reaggregate, 5_000);
        assert_eq!(candidate.pair().to_string(), "course=3 user=9");
    }

    #[test]
    fn test_tracking_record_serializes_open_completion_as_null() {
        let record = CompletionTrackingRecord {
            id: 1,
            course_id: 3,
            user_id: 9,
            time_enrolled: 1_000,
            time_started: 0,
            time_completed: None,
            reaggregate: 5_000,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["time_completed"], serde_json::Value::Null);
        assert_eq!(json["time_enrolled"], 1_000);
        assert_eq!(json["reaggregate"], 5_000);
    }

    #[test]
    fn test_report_processed_counts_failures() {
        let report = RecordReport {
            created: 2,
            skipped: 1,
            failed: vec![RecordFailure {
                pair: CoursePair { course_id: 1, user_id: 1 },
                cause: "disk I/O error".to_string(),
            }],
        };
        assert_eq!(report.processed(), 4);
        assert!(report.has_failures());
    }
}
