// ==========================================
// 课程完成度跟踪 - 完成度记录写入引擎
// ==========================================
// 职责: 消费候选流，为每对 (course, user) 至多创建一条完成度记录
// 规则:
// - 写入前重新检查是否已存在（扫描与写入之间可能有并发任务写入）
// - 唯一约束冲突 = 并发竞争，计入 skipped
// - 其它单条写入失败计入 failed，继续处理下一条
// - 候选流本身报错（读阶段）立即中止并返回错误
// ==========================================

use crate::domain::completion::{
    CompletionCandidate, NewCompletionRecord, RecordFailure, RecordReport,
};
use crate::domain::types::Timestamp;
use crate::repository::{CompletionRecordStore, RepositoryResult};
use tracing::{debug, instrument, warn};

/// 单条候选的写入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Created(i64),
    Skipped,
    Failed(String),
}

// ==========================================
// TrackingRecorder - 完成度记录写入器
// ==========================================
pub struct TrackingRecorder<S>
where
    S: CompletionRecordStore,
{
    store: S,
}

impl<S> TrackingRecorder<S>
where
    S: CompletionRecordStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// 处理单条候选
    pub fn record_one(&self, candidate: &CompletionCandidate, now: Timestamp) -> RecordOutcome {
        match self.store.exists(candidate.course_id, candidate.user_id) {
            Ok(true) => return RecordOutcome::Skipped,
            Ok(false) => {}
            Err(e) => return RecordOutcome::Failed(e.to_string()),
        }

        let record = NewCompletionRecord::from_candidate(candidate, now);
        match self.store.insert(&record) {
            Ok(id) => RecordOutcome::Created(id),
            Err(e) if e.is_unique_violation() => {
                debug!(pair = %candidate.pair(), "并发任务已写入，跳过");
                RecordOutcome::Skipped
            }
            Err(e) => RecordOutcome::Failed(e.to_string()),
        }
    }

    /// 批量写入
    ///
    /// # 参数
    /// - candidates: 候选流（读阶段错误以 Err 项出现）
    /// - now: 写入 reaggregate 的时间
    ///
    /// # 返回
    /// - Ok(RecordReport): 全部候选已处理（单条失败在 report.failed 中）
    /// - Err: 候选流读取失败，批次中止
    #[instrument(skip(self, candidates))]
    pub fn record<I>(&self, candidates: I, now: Timestamp) -> RepositoryResult<RecordReport>
    where
        I: IntoIterator<Item = RepositoryResult<CompletionCandidate>>,
    {
        let mut report = RecordReport::default();

        for candidate in candidates {
            let candidate = candidate?;
            match self.record_one(&candidate, now) {
                RecordOutcome::Created(id) => {
                    debug!(pair = %candidate.pair(), id, time_enrolled = candidate.candidate_start, "已标记开始");
                    report.created += 1;
                }
                RecordOutcome::Skipped => report.skipped += 1,
                RecordOutcome::Failed(cause) => {
                    warn!(pair = %candidate.pair(), cause = %cause, "完成度记录写入失败");
                    report.failed.push(RecordFailure {
                        pair: candidate.pair(),
                        cause,
                    });
                }
            }
        }

        Ok(report)
    }
}
