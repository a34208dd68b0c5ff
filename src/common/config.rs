//! Configuration loaded from the per-user configuration directory.
//!
//! Credentials live in two JSON files next to the log file, the download
//! directory and the sync ledger:
//!
//! ```text
//! ~/.komoot2strava/
//!     komoot_account.json   {"email": "..", "password": "..", "user_id": ".."}
//!     strava_account.json   {"access_token": ".."}
//!     komoot2strava.log
//!     synced_tours.json
//!     downloaded/
//! ```
//!
//! Tunables default to the values below and can be overridden through
//! environment variables (a `.env` file is honored by the binary).

use crate::common::error::ConfigError;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

pub const DEFAULT_DIR_NAME: &str = ".komoot2strava";
pub const KOMOOT_CREDENTIALS_FILE: &str = "komoot_account.json";
pub const STRAVA_CREDENTIALS_FILE: &str = "strava_account.json";
pub const LOG_FILE: &str = "komoot2strava.log";
pub const LEDGER_FILE: &str = "synced_tours.json";
pub const DOWNLOADS_DIR: &str = "downloaded";

pub const KOMOOT_ACCOUNT_URL: &str = "https://account.komoot.com";
pub const KOMOOT_API_URL: &str = "https://www.komoot.com/api/v007";
pub const STRAVA_API_URL: &str = "https://www.strava.com/api/v3";

/// Komoot login, loaded from `komoot_account.json`.
#[derive(Clone, Deserialize)]
pub struct KomootCredentials {
    pub email: String,
    pub password: String,
    /// Numeric Komoot user id, as shown in profile URLs.
    pub user_id: String,
}

impl fmt::Debug for KomootCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KomootCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Strava token with `activity:write` scope, loaded from `strava_account.json`.
#[derive(Clone, Deserialize)]
pub struct StravaCredentials {
    pub access_token: String,
}

impl fmt::Debug for StravaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StravaCredentials")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct KomootApiConfig {
    pub account_url: String,
    pub api_url: String,
    /// Value of the `hl` query parameter.
    pub locale: String,
    pub page_size: u32,
}

impl Default for KomootApiConfig {
    fn default() -> Self {
        Self {
            account_url: KOMOOT_ACCOUNT_URL.to_string(),
            api_url: KOMOOT_API_URL.to_string(),
            locale: "nl".to_string(),
            page_size: 24,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StravaApiConfig {
    pub api_url: String,
    pub upload_poll_interval: Duration,
    pub upload_timeout: Duration,
}

impl Default for StravaApiConfig {
    fn default() -> Self {
        Self {
            api_url: STRAVA_API_URL.to_string(),
            upload_poll_interval: Duration::from_secs(1),
            upload_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Retries for transient Komoot failures; 0 disables retrying.
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_file: PathBuf,
    pub console_level: LevelFilter,
    pub file_level: LevelFilter,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    pub komoot: KomootCredentials,
    pub strava: StravaCredentials,
    pub komoot_api: KomootApiConfig,
    pub strava_api: StravaApiConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load credentials from `config_dir` and apply environment overrides.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_dir(config_dir)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load credentials from `config_dir`, all tunables at their defaults.
    pub fn from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let komoot: KomootCredentials =
            read_json_file(&config_dir.join(KOMOOT_CREDENTIALS_FILE))?;
        let strava: StravaCredentials =
            read_json_file(&config_dir.join(STRAVA_CREDENTIALS_FILE))?;

        if komoot.user_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "user_id",
                value: komoot.user_id,
            });
        }

        Ok(Self {
            config_dir: config_dir.to_path_buf(),
            komoot,
            strava,
            komoot_api: KomootApiConfig::default(),
            strava_api: StravaApiConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig {
                log_file: config_dir.join(LOG_FILE),
                console_level: LevelFilter::INFO,
                file_level: LevelFilter::DEBUG,
            },
        })
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(level) = env_value("KOMOOT2STRAVA_CONSOLE_LOG") {
            self.logging.console_level = parse_level("KOMOOT2STRAVA_CONSOLE_LOG", level)?;
        }
        if let Some(level) = env_value("KOMOOT2STRAVA_FILE_LOG") {
            self.logging.file_level = parse_level("KOMOOT2STRAVA_FILE_LOG", level)?;
        }
        if let Some(locale) = env_value("KOMOOT2STRAVA_LOCALE") {
            self.komoot_api.locale = locale;
        }
        if let Some(secs) = env_value("KOMOOT2STRAVA_UPLOAD_TIMEOUT_SECS") {
            self.strava_api.upload_timeout =
                Duration::from_secs(parse_number("KOMOOT2STRAVA_UPLOAD_TIMEOUT_SECS", secs)?);
        }
        if let Some(secs) = env_value("KOMOOT2STRAVA_HTTP_TIMEOUT_SECS") {
            self.http.request_timeout =
                Duration::from_secs(parse_number("KOMOOT2STRAVA_HTTP_TIMEOUT_SECS", secs)?);
        }
        if let Some(retries) = env_value("KOMOOT2STRAVA_MAX_RETRIES") {
            self.http.max_retries = parse_number("KOMOOT2STRAVA_MAX_RETRIES", retries)?;
        }
        Ok(())
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.config_dir.join(DOWNLOADS_DIR)
    }

    pub fn ledger_file(&self) -> PathBuf {
        self.config_dir.join(LEDGER_FILE)
    }
}

/// Pick the configuration directory: explicit path first, then
/// `~/.komoot2strava`.
pub fn resolve_config_dir(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DEFAULT_DIR_NAME))
        .ok_or(ConfigError::NoHomeDir)
}

fn read_json_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::MissingFile(path.to_path_buf())
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_level(key: &'static str, value: String) -> Result<LevelFilter, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
