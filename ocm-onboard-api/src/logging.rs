//! Logging setup
//! Console output plus an optional rolling JSON log file

use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "ocm-onboard.log";

/// Keeps the file writer flushing; hold it for the life of the process
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Filter from `RUST_LOG`, else the configured level
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig) -> Result<LogGuard, Box<dyn std::error::Error + Send + Sync>> {
    let console_layer = if config.json {
        fmt::layer()
            .with_target(true)
            .json()
            .with_writer(io::stdout)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .with_writer(io::stdout)
            .boxed()
    };

    let (file_layer, guard) = if config.file_logging_enabled {
        std::fs::create_dir_all(&config.log_dir)?;
        let (writer, guard) = non_blocking(rolling::daily(&config.log_dir, LOG_FILE_NAME));
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .json()
            .with_writer(writer)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        level = %config.level,
        file_logging = config.file_logging_enabled,
        "Logging initialized"
    );

    Ok(LogGuard { _file: guard })
}
