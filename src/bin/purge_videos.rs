//! Delete every video and all rows referencing it, then reset channel counters.
//!
//! This is irreversible. Run with: cargo run --bin purge-videos
//! Set `PURGE__DRY_RUN=true` to only print what would be deleted, and
//! `PURGE__ATOMIC=false` to commit each step on its own.

use std::process::ExitCode;

use video_admin::config::{Config, PurgeConfig};
use video_admin::db::Database;
use video_admin::purge::{PurgeEvent, PurgeStep, VideoPurgeJob};
use video_admin::store::PgVideoStore;

#[tokio::main]
async fn main() -> ExitCode {
    video_admin::logging::init("purge_videos=info,video_admin=info");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Video purge failed");
            eprintln!("Video purge failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;

    println!("Connecting to database...");
    let db = Database::connect(&config.database).await?;
    println!("Connected successfully!");

    let result = purge(&db, &config.purge).await;
    db.close().await;
    result
}

async fn purge(db: &Database, config: &PurgeConfig) -> anyhow::Result<()> {
    let job = VideoPurgeJob::new();
    let store = PgVideoStore::new(db.pg.clone());

    if config.dry_run {
        let report = job.dry_run(&store).await?;
        println!("Dry run, nothing will be deleted:");
        for (table, rows) in &report.rows {
            println!("  {table}: {rows} rows");
        }
        println!("  channels to reset: {}", report.channels);
        return Ok(());
    }

    let result = if config.atomic {
        job.run_in_transaction(&store, print_progress).await
    } else {
        job.run_with_progress(&store, print_progress).await
    };

    let report = match result {
        Ok(report) => report,
        Err(e) if config.atomic => {
            println!("Purge failed, transaction rolled back: nothing was deleted");
            return Err(e.into());
        }
        Err(e) => {
            println!("Purge failed, steps reported above were already committed");
            return Err(e.into());
        }
    };

    println!("\n========================================");
    println!("All videos deleted!");
    println!("========================================");
    println!("Rows deleted:     {}", report.total_deleted());
    println!("Channels reset:   {}", report.channels_reset);
    println!(
        "Duration:         {} ms",
        (report.finished_at - report.started_at).num_milliseconds()
    );

    Ok(())
}

fn print_progress(event: PurgeEvent) {
    match event {
        PurgeEvent::Started(PurgeStep::Delete(table)) => println!("Deleting {table}..."),
        PurgeEvent::Started(PurgeStep::ResetChannelAggregates) => {
            println!("Resetting channel video counts and views...")
        }
        PurgeEvent::Finished { step: PurgeStep::Delete(_), rows } => println!("  deleted {rows} rows"),
        PurgeEvent::Finished {
            step: PurgeStep::ResetChannelAggregates,
            rows,
        } => println!("  reset {rows} channels"),
    }
}
