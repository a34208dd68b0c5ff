//! Komoot -> Strava tour synchronization.
//!
//! Tours are walked page by page, newest first. Each tour that is neither in
//! the [`SyncLedger`] nor present in the download directory is downloaded and
//! uploaded. With `break_on_existing` set, the first tour that was already
//! synced ends the run, on the assumption that everything older was synced
//! too. A back-dated tour added on Komoot after a later one was synced is
//! therefore missed unless the run is repeated with `break_on_existing` off.

use crate::common::error::{KomootError, UploadError};
use crate::common::types::{ActivityType, Tour, TourPage, UploadedActivity};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod filename;
pub mod ledger;
mod sync;

pub use filename::derive_filename;
pub use ledger::SyncLedger;

/// Where tours come from.
#[allow(async_fn_in_trait)]
pub trait TourSource {
    /// Fetch one 0-indexed page of tours, newest first.
    async fn fetch_page(&self, page: u32) -> Result<TourPage, KomootError>;

    /// Write the GPX track of `tour` to `path`.
    async fn download_track(&self, tour: &Tour, path: &Path) -> Result<(), KomootError>;
}

/// Where tracks go.
#[allow(async_fn_in_trait)]
pub trait ActivityUploader {
    /// Upload a GPX file and wait until the activity exists.
    async fn upload(
        &self,
        path: &Path,
        name: &str,
        activity_type: Option<ActivityType>,
    ) -> Result<UploadedActivity, UploadError>;
}

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub break_on_existing: bool,
    /// Only log what would be downloaded and uploaded.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            break_on_existing: true,
            dry_run: false,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub pages_fetched: usize,
    pub tours_checked: usize,
    pub already_present: usize,
    pub downloaded: usize,
    pub uploaded: usize,
    pub upload_failures: usize,
    pub skipped_invalid: usize,
    pub dry_run_pending: usize,
    pub stopped_early: bool,
}

impl SyncStats {
    pub fn log_summary(&self) {
        info!(
            pages = self.pages_fetched,
            checked = self.tours_checked,
            already_present = self.already_present,
            downloaded = self.downloaded,
            uploaded = self.uploaded,
            upload_failures = self.upload_failures,
            skipped_invalid = self.skipped_invalid,
            dry_run_pending = self.dry_run_pending,
            stopped_early = self.stopped_early,
            "Sync summary"
        );
    }
}

pub struct TourSync<S, U> {
    source: S,
    uploader: U,
    downloads_dir: PathBuf,
    ledger: SyncLedger,
    options: SyncOptions,
}

impl<S: TourSource, U: ActivityUploader> TourSync<S, U> {
    pub fn new(
        source: S,
        uploader: U,
        downloads_dir: &Path,
        ledger: SyncLedger,
        options: SyncOptions,
    ) -> Self {
        Self {
            source,
            uploader,
            downloads_dir: downloads_dir.to_path_buf(),
            ledger,
            options,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    pub fn ledger(&self) -> &SyncLedger {
        &self.ledger
    }
}
