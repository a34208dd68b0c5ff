use super::{ActivityUploader, SyncStats, TourSource, TourSync, derive_filename};
use crate::common::error::SyncError;
use crate::common::types::{ActivityType, Tour, TourPage};
use tracing::{error, info, warn};

enum TourOutcome {
    AlreadyPresent,
    Processed,
    Skipped,
}

impl<S: TourSource, U: ActivityUploader> TourSync<S, U> {
    /// Walk all tour pages until pagination ends or, with
    /// `break_on_existing`, the first already-synced tour is found.
    pub async fn run(&mut self) -> Result<SyncStats, SyncError> {
        if !self.options.dry_run {
            tokio::fs::create_dir_all(&self.downloads_dir)
                .await
                .map_err(|source| SyncError::DownloadDir {
                    path: self.downloads_dir.clone(),
                    source,
                })?;
        }

        let mut stats = SyncStats::default();
        let mut page = 0;

        'pages: loop {
            info!(page, "Fetching page");
            let tours = match self.source.fetch_page(page).await? {
                TourPage::Tours(tours) => tours,
                TourPage::Exhausted => {
                    info!(page, "Reached end of Komoot pages");
                    break;
                }
            };
            stats.pages_fetched += 1;

            for tour in &tours {
                let outcome = self.process_tour(tour, &mut stats).await?;
                if matches!(outcome, TourOutcome::AlreadyPresent) && self.options.break_on_existing
                {
                    info!("Stopping further processing as break_on_existing is set");
                    stats.stopped_early = true;
                    break 'pages;
                }
            }

            page += 1;
        }

        Ok(stats)
    }

    async fn process_tour(
        &mut self,
        tour: &Tour,
        stats: &mut SyncStats,
    ) -> Result<TourOutcome, SyncError> {
        stats.tours_checked += 1;
        info!(tour_id = %tour.id, date = %tour.date, "Checking tour {}", tour.name);

        let file_name = match derive_filename(tour) {
            Ok(file_name) => file_name,
            Err(e) => {
                warn!(tour_id = %tour.id, error = %e, "Skipping tour");
                stats.skipped_invalid += 1;
                return Ok(TourOutcome::Skipped);
            }
        };
        let path = self.downloads_dir.join(&file_name);

        if self.ledger.contains(&tour.id) || path.is_file() {
            info!(path = %path.display(), "Tour already available on disk");
            stats.already_present += 1;
            return Ok(TourOutcome::AlreadyPresent);
        }

        let activity_type = ActivityType::from_sport(&tour.sport);

        if self.options.dry_run {
            info!(
                path = %path.display(),
                activity_type = ?activity_type,
                "Dry run: would download and upload tour"
            );
            stats.dry_run_pending += 1;
            return Ok(TourOutcome::Skipped);
        }

        info!("Tour not available on disk, downloading");
        self.source.download_track(tour, &path).await?;
        stats.downloaded += 1;

        self.ledger.insert(&tour.id, &file_name);
        self.ledger.save().await?;

        match self.uploader.upload(&path, &tour.name, activity_type).await {
            Ok(activity) => {
                info!(
                    activity_id = activity.activity_id,
                    upload_id = activity.upload_id,
                    "Succeeded uploading activity"
                );
                stats.uploaded += 1;
            }
            Err(e) => {
                error!(tour_id = %tour.id, error = %e, "Failed to upload to Strava");
                stats.upload_failures += 1;
            }
        }

        Ok(TourOutcome::Processed)
    }
}
