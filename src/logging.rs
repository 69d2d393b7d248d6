//! Logging configuration with journald support on Linux.
//!
//! Sets up tracing-based logging that goes to systemd's journal on Linux,
//! with a rolling log file or stderr as fallback.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// On Linux this first tries systemd-journald. Otherwise logs go to a daily
/// file in `log_dir`, or to stderr when no directory is given.
///
/// Log level is read from the `GALLERIA_LOG` environment variable
/// (`debug`, `info`, `warn`, `error`); the default is `info`.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_env("GALLERIA_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald_layer)
                .try_init()?;

            tracing::info!("Logging initialized with journald backend");
            return Ok(());
        }
    }

    let Some(log_dir) = log_dir else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
        return Ok(());
    };

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "galleria.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The worker flushes on drop, so it has to outlive main.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;

    tracing::info!("Logging initialized with file backend at {:?}", log_dir);
    Ok(())
}
