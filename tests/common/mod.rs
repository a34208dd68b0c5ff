use komoot_strava_sync::common::error::{KomootError, UploadError};
use komoot_strava_sync::common::types::{ActivityType, Tour, TourPage, UploadedActivity};
use komoot_strava_sync::tour_sync::{
    ActivityUploader, SyncLedger, SyncOptions, TourSource, TourSync,
};
use reqwest::StatusCode;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tempdir::TempDir;

#[allow(dead_code)]
pub fn tour(id: &str, name: &str, date: &str, sport: &str) -> Tour {
    Tour {
        id: id.to_string(),
        name: name.to_string(),
        date: date.to_string(),
        sport: sport.to_string(),
    }
}

/// In-memory Komoot: serves the given pages, then an exhausted page.
#[derive(Default)]
pub struct FakeSource {
    pages: Vec<Vec<Tour>>,
    fail_page: Option<u32>,
    pub fetched_pages: Mutex<Vec<u32>>,
    pub downloaded: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeSource {
    pub fn new(pages: Vec<Vec<Tour>>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn failing_on_page(mut self, page: u32) -> Self {
        self.fail_page = Some(page);
        self
    }

    pub fn fetched_pages(&self) -> Vec<u32> {
        self.fetched_pages.lock().unwrap().clone()
    }

    pub fn downloaded(&self) -> Vec<String> {
        self.downloaded.lock().unwrap().clone()
    }
}

impl TourSource for FakeSource {
    async fn fetch_page(&self, page: u32) -> Result<TourPage, KomootError> {
        self.fetched_pages.lock().unwrap().push(page);
        if self.fail_page == Some(page) {
            return Err(KomootError::Http(StatusCode::INTERNAL_SERVER_ERROR));
        }
        Ok(self
            .pages
            .get(page as usize)
            .cloned()
            .map(TourPage::Tours)
            .unwrap_or(TourPage::Exhausted))
    }

    async fn download_track(&self, tour: &Tour, path: &Path) -> Result<(), KomootError> {
        self.downloaded.lock().unwrap().push(tour.id.clone());
        // Same write-then-rename as the real client.
        let partial = path.with_extension("gpx.part");
        let io_err = |source| KomootError::Io {
            path: partial.clone(),
            source,
        };
        tokio::fs::write(&partial, format!("<gpx><trk><name>{}</name></trk></gpx>", tour.name))
            .await
            .map_err(io_err)?;
        tokio::fs::rename(&partial, path).await.map_err(io_err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub path: PathBuf,
    pub name: String,
    pub activity_type: Option<ActivityType>,
}

/// In-memory Strava: accepts every upload except those named in `fail_names`.
#[derive(Default)]
pub struct FakeUploader {
    fail_names: HashSet<String>,
    next_id: AtomicU64,
    pub uploads: Mutex<Vec<RecordedUpload>>,
}

#[allow(dead_code)]
impl FakeUploader {
    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            fail_names: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

impl ActivityUploader for FakeUploader {
    async fn upload(
        &self,
        path: &Path,
        name: &str,
        activity_type: Option<ActivityType>,
    ) -> Result<UploadedActivity, UploadError> {
        self.uploads.lock().unwrap().push(RecordedUpload {
            path: path.to_path_buf(),
            name: name.to_string(),
            activity_type,
        });

        let upload_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_names.contains(name) {
            return Err(UploadError::Processing {
                upload_id,
                message: "There was an error processing your activity.".to_string(),
            });
        }
        Ok(UploadedActivity {
            upload_id,
            activity_id: 1000 + upload_id,
        })
    }
}

/// Scratch configuration directory with a download dir and ledger path.
#[allow(dead_code)]
pub struct Workspace {
    pub dir: TempDir,
}

#[allow(dead_code)]
impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new("komoot2strava").unwrap(),
        }
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.dir.path().join("downloaded")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.path().join("synced_tours.json")
    }

    /// Pretend a track was downloaded by an earlier run.
    pub fn place_track(&self, file_name: &str) {
        std::fs::create_dir_all(self.downloads_dir()).unwrap();
        std::fs::write(self.downloads_dir().join(file_name), "<gpx/>").unwrap();
    }

    pub async fn sync_job(
        &self,
        source: FakeSource,
        uploader: FakeUploader,
        options: SyncOptions,
    ) -> TourSync<FakeSource, FakeUploader> {
        let ledger = SyncLedger::load(self.ledger_path()).await.unwrap();
        TourSync::new(source, uploader, &self.downloads_dir(), ledger, options)
    }
}
