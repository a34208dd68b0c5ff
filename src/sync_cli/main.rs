use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use komoot_strava_sync::common::{
    config::{self, Config},
    komoot_client::KomootClient,
    logging,
    strava_client::StravaClient,
};
use komoot_strava_sync::tour_sync::{SyncLedger, TourSync};

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    let config_dir = config::resolve_config_dir(args.config_dir.clone())?;
    let config = Config::load(&config_dir)
        .with_context(|| format!("Failed to load configuration from {}", config_dir.display()))?;

    logging::init(&config.logging)?;

    let options = args.sync_options();
    info!(
        config_dir = %config.config_dir.display(),
        break_on_existing = options.break_on_existing,
        dry_run = options.dry_run,
        "Starting Komoot to Strava sync"
    );

    let komoot = KomootClient::login(&config)
        .await
        .inspect_err(|e| error!(error = %e, "Komoot login failed"))?;
    let strava = StravaClient::from_config(&config)?;
    let ledger = SyncLedger::load(config.ledger_file()).await?;

    let mut sync_job = TourSync::new(komoot, strava, &config.downloads_dir(), ledger, options);

    let stats = sync_job
        .run()
        .await
        .inspect_err(|e| error!(error = %e, "Sync aborted"))?;

    stats.log_summary();
    Ok(())
}
