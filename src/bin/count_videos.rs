//! Print how many videos exist and how they spread across channels.
//! Run with: cargo run --bin count-videos

use std::process::ExitCode;

use video_admin::config::Config;
use video_admin::db::Database;
use video_admin::report::CountReport;
use video_admin::store::PgVideoStore;

#[tokio::main]
async fn main() -> ExitCode {
    video_admin::logging::init("count_videos=info,video_admin=warn");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Video count failed");
            eprintln!("Video count failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    let db = Database::connect(&config.database).await?;

    let store = PgVideoStore::new(db.pg.clone());
    let result = CountReport::gather(&store).await;
    db.close().await;

    print!("{}", result?);
    Ok(())
}
