// Console plus rotating file output
use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, InitError, RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Daily `<prefix>.<date>.log` files under the configured directory; the oldest
/// is removed once `max_files` is exceeded.
pub fn file_appender(config: &LoggingConfig) -> Result<RollingFileAppender, InitError> {
    Builder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(config.file_prefix.clone())
        .filename_suffix("log")
        .max_log_files(config.max_files)
        .build(&config.directory)
}

/// Installs the global subscriber. The returned guard flushes the file writer
/// on drop and must live as long as `main`.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard, InitError> {
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender(config)?);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}
