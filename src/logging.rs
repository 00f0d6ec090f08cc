use std::io;

use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::settings::LoggingSettings;

pub const DEFAULT_FILTER: &str = "info";
const LOG_FILE_PREFIX: &str = "csvpg.log";

/// Install the global subscriber: human-readable logs on stderr and, when a
/// directory is configured, a daily-rolling file. Keep the returned guard
/// alive until exit or buffered file lines are lost.
///
/// Filter precedence: a valid `settings.filter` (already carrying
/// `CSVPG_LOG`), then `RUST_LOG`, then [`DEFAULT_FILTER`]. Only the first
/// call installs anything; later calls return `None`.
pub fn init_logging(settings: &LoggingSettings) -> Option<WorkerGuard> {
    let filter = settings
        .filter
        .as_deref()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(false);

    match &settings.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false);
            match tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init()
            {
                Ok(()) => Some(guard),
                Err(err) => {
                    debug!(error = %err, "subscriber already installed, file logging skipped");
                    None
                }
            }
        }
        None => {
            if let Err(err) = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .try_init()
            {
                debug!(error = %err, "subscriber already installed");
            }
            None
        }
    }
}
