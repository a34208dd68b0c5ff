use crate::common::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persisted record of tours that were downloaded, keyed by Komoot tour id.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncLedger {
    #[serde(skip)]
    path: PathBuf,
    pub last_updated: String,
    /// Tour id -> track file name.
    pub tours: BTreeMap<String, String>,
}

impl SyncLedger {
    pub fn new_empty(path: PathBuf) -> Self {
        Self {
            path,
            last_updated: chrono::Utc::now().to_rfc3339(),
            tours: BTreeMap::new(),
        }
    }

    /// Load the ledger at `path`, starting empty if it does not exist yet.
    pub async fn load(path: PathBuf) -> Result<Self, LedgerError> {
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No sync ledger found, starting fresh");
                return Ok(Self::new_empty(path));
            }
            Err(source) => return Err(LedgerError::Io { path, source }),
        };

        let mut ledger: SyncLedger =
            serde_json::from_str(&contents).map_err(|source| LedgerError::Parse {
                path: path.clone(),
                source,
            })?;
        ledger.path = path;

        debug!(tours = ledger.len(), "Loaded sync ledger");
        Ok(ledger)
    }

    /// Write the ledger atomically (temp file + rename).
    pub async fn save(&mut self) -> Result<(), LedgerError> {
        self.last_updated = chrono::Utc::now().to_rfc3339();

        let json = serde_json::to_string_pretty(self).map_err(|source| LedgerError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        let io_error = |source| LedgerError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        tokio::fs::write(&tmp_path, json).await.map_err(io_error)?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(io_error)?;

        Ok(())
    }

    pub fn insert(&mut self, tour_id: &str, file_name: &str) {
        self.tours.insert(tour_id.to_string(), file_name.to_string());
    }

    pub fn contains(&self, tour_id: &str) -> bool {
        self.tours.contains_key(tour_id)
    }

    pub fn len(&self) -> usize {
        self.tours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tours.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
