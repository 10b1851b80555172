// ==========================================
// 课程完成度跟踪 - SQL 诊断
// ==========================================
// 职责: SQLite 语句计数 + 慢查询日志，仅用于诊断，不影响业务结果
// ==========================================

use rusqlite::Connection;
use serde::Serialize;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 开关环境变量
pub const PERF_SQL_ENV: &str = "COMPLETION_TRACKER_PERF_SQL";
/// 慢 SQL 阈值环境变量（毫秒）
pub const SLOW_SQL_MS_ENV: &str = "COMPLETION_TRACKER_SLOW_SQL_MS";

static PERF_SQL_ENABLED: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static PERF_DEPTH: Cell<u32> = const { Cell::new(0) };
    static SQL_COUNT: Cell<u64> = const { Cell::new(0) };
    static SLOW_SQL_COUNT: Cell<u64> = const { Cell::new(0) };
}

fn is_true(v: &str) -> bool {
    matches!(
        v.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn truncate_sql(sql: &str, max_len: usize) -> String {
    let s = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

/// 安装 SQLite 语句 trace/profile（用于 SQL 计数 + 慢查询日志）
///
/// 开关：
/// - Debug 默认开启；Release 默认关闭
/// - `COMPLETION_TRACKER_PERF_SQL=1` 强制开启
/// - `COMPLETION_TRACKER_SLOW_SQL_MS=50` 配置慢 SQL 阈值（毫秒）
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let enabled = match std::env::var(PERF_SQL_ENV) {
        Ok(v) => is_true(&v),
        Err(_) => cfg!(debug_assertions),
    };

    PERF_SQL_ENABLED.store(enabled, Ordering::Relaxed);

    if !enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    let slow_ms = std::env::var(SLOW_SQL_MS_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    SLOW_SQL_THRESHOLD_MS.store(slow_ms, Ordering::Relaxed);

    conn.trace(Some(sql_trace_callback));
    conn.profile(Some(sql_profile_callback));
}

fn sql_trace_callback(_sql: &str) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    if PERF_DEPTH.with(|d| d.get() == 0) {
        return;
    }
    SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
}

fn sql_profile_callback(sql: &str, duration: Duration) {
    if !PERF_SQL_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_THRESHOLD_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        tracing::warn!(
            target: "slow_sql",
            duration_ms = ms,
            sql = %truncate_sql(sql, 420),
            "slow sql"
        );
        if PERF_DEPTH.with(|d| d.get() > 0) {
            SLOW_SQL_COUNT.with(|c| c.set(c.get().saturating_add(1)));
        }
    }
}

/// 一次被度量操作的统计结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PerfStats {
    pub elapsed_ms: u64,
    pub sql_count: u64,
    pub slow_sql_count: u64,
}

/// 性能统计 Guard：记录 elapsed_ms + SQL 语句数 + 慢 SQL 数
///
/// drop 时写一条 `perf` 日志；需要把统计值带出去时调用 [`PerfGuard::finish`]。
///
/// ```ignore
/// let perf = completion_tracker::perf::PerfGuard::new("completion_daily");
/// // do work...
/// let stats = perf.finish();
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    sql_start: u64,
    slow_sql_start: u64,
    finished: bool,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        PERF_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            op,
            start: Instant::now(),
            sql_start: SQL_COUNT.with(|c| c.get()),
            slow_sql_start: SLOW_SQL_COUNT.with(|c| c.get()),
            finished: false,
        }
    }

    fn snapshot(&self) -> PerfStats {
        PerfStats {
            elapsed_ms: self.start.elapsed().as_millis() as u64,
            sql_count: SQL_COUNT.with(|c| c.get()).saturating_sub(self.sql_start),
            slow_sql_count: SLOW_SQL_COUNT
                .with(|c| c.get())
                .saturating_sub(self.slow_sql_start),
        }
    }

    fn close(&mut self) -> PerfStats {
        let stats = self.snapshot();
        if !self.finished {
            self.finished = true;
            tracing::info!(
                target: "perf",
                op = self.op,
                elapsed_ms = stats.elapsed_ms,
                sql_count = stats.sql_count,
                slow_sql_count = stats.slow_sql_count,
                "done"
            );
            PERF_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
        }
        stats
    }

    /// 结束度量并返回统计值
    pub fn finish(mut self) -> PerfStats {
        self.close()
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_sql_collapses_whitespace() {
        let sql = "SELECT  a,\n   b\nFROM t";
        assert_eq!(truncate_sql(sql, 100), "SELECT a, b FROM t");
        assert_eq!(truncate_sql(sql, 6), "SELECT…");
    }

    #[test]
    fn test_perf_guard_finish_is_single_shot() {
        let guard = PerfGuard::new("test");
        let depth_inside = PERF_DEPTH.with(|d| d.get());
        let _ = guard.finish();
        let depth_after = PERF_DEPTH.with(|d| d.get());
        assert_eq!(depth_after + 1, depth_inside);
    }
}
