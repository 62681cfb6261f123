use std::{fs::create_dir_all, io, path::Path};

use thiserror::Error;
use tracing::{Level, subscriber::set_global_default};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{layer::SubscriberExt, registry};

/// Create and set the global loggers.
///
/// Logs are always written to stdout. If `directory` is set, logs are also written to a daily
/// rolling file inside it.
pub fn init_logger(
    level: Level,
    directory: Option<&Path>,
) -> Result<Vec<WorkerGuard>, LoggerError> {
    let filter = tracing_subscriber::filter::Targets::new().with_default(level);
    let mut guards = Vec::with_capacity(2);

    // File layer
    let file_layer = match directory {
        Some(directory) => {
            create_dir_all(directory).map_err(LoggerError::CreateDirectory)?;

            let appender = RollingFileAppender::builder()
                .filename_prefix("n8n-backup")
                .filename_suffix("log")
                .rotation(Rotation::DAILY)
                .max_log_files(90)
                .build(directory)?;

            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);

            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);

            Some(layer)
        }
        None => None,
    };

    // Std layer
    let std_layer = {
        let (writer, guard) = tracing_appender::non_blocking(io::stdout());
        guards.push(guard);

        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(true)
            .with_target(false)
    };

    // Create registry
    let registry = registry().with(file_layer).with(std_layer).with(filter);

    // Set global subscriber
    set_global_default(registry)?;

    Ok(guards)
}

/// Parse a log level name such as `info` or `DEBUG`, falling back to `INFO`.
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" | "CRITICAL" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Failed to create rolling appender:\n{0}")]
    CreateRollingAppender(#[from] tracing_appender::rolling::InitError),

    #[error("Failed to create log directory:\n{0}")]
    CreateDirectory(#[source] io::Error),

    #[error("Failed to set the global subscriber:\n{0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}
