use clap::Parser;
use komoot_strava_sync::tour_sync::SyncOptions;
use std::path::PathBuf;

/// Copy recorded Komoot tours to Strava.
#[derive(Debug, Parser)]
#[command(name = "komoot2strava", version)]
pub struct Cli {
    /// Keep checking older tours after finding one that was already synced
    #[arg(long)]
    pub no_break_on_existing: bool,

    /// Directory holding credentials, log file and downloaded tracks
    /// [default: ~/.komoot2strava]
    #[arg(long, env = "KOMOOT2STRAVA_HOME")]
    pub config_dir: Option<PathBuf>,

    /// Log what would be synced without downloading or uploading anything
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            break_on_existing: !self.no_break_on_existing,
            dry_run: self.dry_run,
        }
    }
}
