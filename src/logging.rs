use std::fs;
use std::path::Path;
use tracing::warn;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "movie_etl.log";

/// Initializes the logging system with both console and file output.
///
/// The returned guard flushes the file writer when dropped, so `main` should
/// hold it until the run is over. When the log directory cannot be created or
/// written, logging continues on the console only and the guard is `None`.
pub fn init_logging() -> Option<WorkerGuard> {
    let file_writer = file_writer(Path::new(LOG_DIR));
    let (writer, guard, file_error) = match file_writer {
        Ok((writer, guard)) => (Some(writer), Some(guard), None),
        Err(e) => (None, None, Some(e)),
    };

    // JSON lines for the file, human-readable for the console
    let file_layer = writer.map(|w| fmt::layer().json().with_writer(w));
    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    // Respect RUST_LOG if set; otherwise info for our crate
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("movie_etl=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    if let Some(e) = file_error {
        warn!("File logging disabled, console only: {}", e);
    }
    guard
}

/// Daily-rolling, non-blocking writer for `dir/movie_etl.log`.
fn file_writer(dir: &Path) -> Result<(NonBlocking, WorkerGuard), String> {
    fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create log directory {}: {}", dir.display(), e))?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE)
        .build(dir)
        .map_err(|e| format!("cannot open log file in {}: {}", dir.display(), e))?;
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn file_writer_creates_the_log_directory() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("nested/logs");
        let (_writer, _guard) = file_writer(&logs).unwrap();
        assert!(logs.is_dir());
    }

    #[test]
    fn unusable_log_directory_is_an_error_not_a_panic() {
        // A regular file cannot be used as the log directory
        let file = NamedTempFile::new().unwrap();
        let err = file_writer(file.path()).unwrap_err();
        assert!(err.contains("cannot create log directory"));
    }
}
