//! Rewrite `Day N: ...` reminder titles whose day number no longer matches
//! the due date. Pass `--dry-run` to only report. Ctrl-C stops between rows;
//! re-running picks up where it left off.

use anyhow::{Context, bail};
use clap::Parser;
use db::DBService;
use server::config::Config;
use services::services::{batch::BatchSummary, reminder_repair::ReminderRepairService};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "repair-titles", about = "Fix drifted day numbers in reminder titles")]
struct Args {
    /// Report the renames without writing them
    #[arg(long)]
    dry_run: bool,

    /// Database to repair; overrides DATABASE_URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }
    utils::logging::init_tracing("info");

    let dry_run = args.dry_run;

    let db = DBService::new(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing current reminder");
            on_signal.cancel();
        }
    });

    let summary = ReminderRepairService::new(db)
        .repair_titles(dry_run, &cancel)
        .await?;

    for failure in &summary.failures {
        warn!(reminder_id = %failure.row_id, error = %failure.error, "Not repaired");
    }
    info!(
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
        cancelled = summary.cancelled,
        dry_run,
        "Done"
    );

    ensure_all_repaired(&summary)
}

fn ensure_all_repaired(summary: &BatchSummary) -> anyhow::Result<()> {
    if summary.failed > 0 {
        bail!("{} reminder(s) could not be repaired", summary.failed);
    }
    Ok(())
}
