// ==========================================
// 课程完成度跟踪 - 命令行入口
// ==========================================
// 用法:
//   completion-daily [--db PATH] [--now EPOCH_SECS]
//   completion-daily [--db PATH] [--now EPOCH_SECS] --explain COURSE_ID USER_ID
//
// 默认执行一次每日完成度任务并输出 JSON 结果；
// --explain 只读解释某学员在某课程的准入结论，不写库。
// ==========================================

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use completion_tracker::config::{CompletionConfigReader, ConfigManager};
use completion_tracker::db::{get_default_db_path, init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use completion_tracker::engine::EligibilityExplainer;
use completion_tracker::repository::{CourseCompletionRepository, EnrolmentRepository};
use completion_tracker::task::{CompletionDailyTask, ScheduledTask};
use completion_tracker::{logging, VERSION};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct CliArgs {
    db_path: Option<String>,
    now: Option<i64>,
    explain: Option<(i64, i64)>,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut cli = CliArgs::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                cli.db_path = Some(args.next().ok_or_else(|| anyhow!("--db 缺少路径"))?);
            }
            "--now" => {
                let raw = args.next().ok_or_else(|| anyhow!("--now 缺少时间戳"))?;
                cli.now = Some(raw.parse().with_context(|| format!("--now 无效: {}", raw))?);
            }
            "--explain" => {
                let course = args.next().ok_or_else(|| anyhow!("--explain 缺少课程 ID"))?;
                let user = args.next().ok_or_else(|| anyhow!("--explain 缺少用户 ID"))?;
                cli.explain = Some((
                    course.parse().with_context(|| format!("课程 ID 无效: {}", course))?,
                    user.parse().with_context(|| format!("用户 ID 无效: {}", user))?,
                ));
            }
            other => bail!("未知参数: {}", other),
        }
    }

    Ok(cli)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = parse_args()?;
    let db_path = cli.db_path.clone().unwrap_or_else(get_default_db_path);

    tracing::info!(version = VERSION, db_path = %db_path, "completion-daily 启动");

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn).context("初始化 schema 失败")?;
    if let Some(version) = read_schema_version(&conn)? {
        if version != CURRENT_SCHEMA_VERSION {
            tracing::warn!(found = version, expected = CURRENT_SCHEMA_VERSION, "schema_version 不一致");
        }
    }
    let conn = Arc::new(Mutex::new(conn));

    let config_manager = ConfigManager::from_connection(conn.clone())?;
    let now = cli.now.unwrap_or_else(|| Utc::now().timestamp());

    if let Some((course_id, user_id)) = cli.explain {
        let config = config_manager.load_completion_config().await?;
        let explainer = EligibilityExplainer::new(
            Arc::new(EnrolmentRepository::new(conn.clone())),
            Arc::new(CourseCompletionRepository::new(conn.clone())),
        );
        let explanation = explainer.explain(course_id, user_id, &config.role_filter, now)?;
        println!("{}", serde_json::to_string_pretty(&explanation)?);
        return Ok(());
    }

    let task = CompletionDailyTask::from_reader(conn, &config_manager).await?;
    tracing::info!(task = %task.name(), config = ?task.config(), "开始执行");

    let outcome = task.run_at(now)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
