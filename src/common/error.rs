//! Error types for each stage of a sync run.

use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot determine home directory, pass --config-dir")]
    NoHomeDir,

    #[error("Missing configuration file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to create log file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install log subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, thiserror::Error)]
pub enum KomootError {
    #[error("Komoot sign-in failed at {step}: HTTP {status}")]
    Authentication {
        step: &'static str,
        status: StatusCode,
    },

    #[error("Komoot returned HTTP {0}")]
    Http(StatusCode),

    #[error("Network error: {0}")]
    Network(#[from] reqwest_middleware::Error),

    #[error("Komoot HTTP error: {0}")]
    Body(#[from] reqwest::Error),

    #[error("Failed to parse tour list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to write track to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Upload failures are recoverable: the run logs them and moves on.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Strava request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Strava rate limit exceeded")]
    RateLimited,

    #[error("Strava rejected the access token")]
    Unauthorized,

    #[error("Strava API error: HTTP {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Strava could not process upload {upload_id}: {message}")]
    Processing { upload_id: u64, message: String },

    #[error("Upload {upload_id} still processing after {}s", waited.as_secs())]
    Timeout { upload_id: u64, waited: Duration },
}

#[derive(Debug, thiserror::Error)]
pub enum FilenameError {
    #[error("Unparseable tour date {date:?}: {source}")]
    InvalidDate {
        date: String,
        #[source]
        source: chrono::ParseError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Failed to access ledger {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt ledger {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Fatal errors that abort a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] KomootError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Failed to create download directory {}: {source}", path.display())]
    DownloadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
