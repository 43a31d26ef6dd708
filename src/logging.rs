//! Logging system initialization
//!
//! Sets up the tracing subscriber according to the loaded configuration:
//! console or file output, optional daily rotation, text or JSON format.

use tracing_appender::rolling;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber.
///
/// Returns a `WorkerGuard` that must be kept alive for the duration of the
/// program so buffered log lines are flushed on exit. Call once during
/// startup, after configuration has been loaded.
///
/// # Panics
/// If the log appender cannot be created or a subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let writer: Box<dyn std::io::Write + Send + Sync> = if config.file.is_empty() {
        Box::new(std::io::stdout())
    } else if config.enable_rotation {
        let dir = std::path::Path::new(&config.file)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let filename = std::path::Path::new(&config.file)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("snaplink.log");
        let appender = rolling::Builder::new()
            .rotation(rolling::Rotation::DAILY)
            .filename_prefix(filename.trim_end_matches(".log"))
            .filename_suffix("log")
            .max_log_files(config.max_backups as usize)
            .build(dir)
            .expect("Failed to create rolling log appender");
        Box::new(appender)
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file)
            .expect("Failed to open log file");
        Box::new(file)
    };

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);
    let filter = tracing_subscriber::EnvFilter::new(config.level.clone());

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(config.file.is_empty());

    if config.format == "json" {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }

    guard
}
