use tracing::Dispatch;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;

/// A logger that discards everything.
pub fn noop_logger() -> Dispatch {
    Dispatch::none()
}

/// Human-readable console logger with timestamps, levels and source locations.
///
/// `level` accepts anything `EnvFilter` understands (`debug`, `pull_consumer=trace`);
/// invalid directives fall back to `info`.
pub fn console_logger(level: &str) -> Dispatch {
    let filter = EnvFilter::try_new(level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    Dispatch::new(subscriber)
}

/// Installs [`console_logger`] as the process-wide default.
pub fn init_global(level: &str) -> Result<(), SetGlobalDefaultError> {
    tracing::dispatcher::set_global_default(console_logger(level))
}
