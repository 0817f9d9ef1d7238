//! Subscriber setup for the `wardsync` binary
//!
//! Events from wardsync itself are filtered at the configured level. The
//! PostgreSQL driver and pool only report warnings, which is where refused
//! connections and TLS failures show up. `RUST_LOG` replaces both.

use crate::config::LoggingConfig;
use crate::domain::{Result, WardsyncError};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// File name prefix of the rolling JSON log
pub const LOG_FILE_PREFIX: &str = "wardsync.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the file writer flushing until the process ends
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Directory of the JSON log file, when file logging is on
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Install the global subscriber
///
/// `log_level` comes from `--log-level` or `application.log_level`.
///
/// # Errors
///
/// Returns a configuration error for an unknown level or when the log
/// directory cannot be created.
pub fn init_logging(log_level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = Level::from_str(log_level).map_err(|_| {
        WardsyncError::Configuration(format!(
            "Invalid log level: {log_level}. Must be one of: trace, debug, info, warn, error"
        ))
    })?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let mut layers: Vec<BoxedLayer> = vec![console_layer(config.json, filter.clone())];

    let (worker, log_dir) = if config.local_enabled {
        let dir = PathBuf::from(&config.local_path);
        std::fs::create_dir_all(&dir).map_err(|e| {
            WardsyncError::Configuration(format!(
                "Failed to create log directory {}: {e}",
                dir.display()
            ))
        })?;

        let appender =
            RollingFileAppender::new(rotation(&config.local_rotation), &dir, LOG_FILE_PREFIX);
        let (writer, worker) = tracing_appender::non_blocking(appender);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
        );
        (Some(worker), Some(dir))
    } else {
        (None, None)
    };

    tracing_subscriber::registry().with(layers).init();

    Ok(LoggingGuard {
        _worker: worker,
        log_dir,
    })
}

fn default_directives(level: Level) -> String {
    format!("wardsync={level},tokio_postgres=warn,deadpool_postgres=warn")
}

fn console_layer(json: bool, filter: EnvFilter) -> BoxedLayer {
    if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_filter(filter)
            .boxed()
    }
}

/// Config values are validated, so anything else is `daily`
fn rotation(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_directives_keep_driver_at_warn() {
        let directives = default_directives(Level::DEBUG);
        assert!(directives.starts_with("wardsync=DEBUG"));
        assert!(directives.contains("tokio_postgres=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test_case("hourly", Rotation::HOURLY)]
    #[test_case("never", Rotation::NEVER)]
    #[test_case("daily", Rotation::DAILY)]
    fn test_rotation(name: &str, expected: Rotation) {
        assert_eq!(rotation(name), expected);
    }

    #[test]
    fn test_unknown_level_is_configuration_error() {
        let result = init_logging("verbose", &LoggingConfig::default());
        assert!(matches!(result, Err(WardsyncError::Configuration(_))));
    }
}
