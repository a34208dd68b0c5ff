//! Console and log file output.
//!
//! The subscriber is built once by the binary before any sync work starts.
//! The previous run's log file is removed first, so the file only ever holds
//! the latest run.

use crate::common::config::LoggingConfig;
use crate::common::error::LoggingError;
use std::fs::{self, File};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let file = open_log_file(config)?;

    // RUST_LOG takes precedence over the configured console level.
    let console_filter = EnvFilter::builder()
        .with_default_directive(config.console_level.into())
        .from_env_lossy();

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let log_file = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_filter(config.file_level);

    tracing_subscriber::registry()
        .with(console)
        .with(log_file)
        .try_init()?;

    Ok(())
}

fn open_log_file(config: &LoggingConfig) -> Result<File, LoggingError> {
    let _ = fs::remove_file(&config.log_file);

    let io_error = |source| LoggingError::Io {
        path: config.log_file.clone(),
        source,
    };

    if let Some(parent) = config.log_file.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    File::create(&config.log_file).map_err(io_error)
}
