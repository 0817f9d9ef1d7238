//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Configurable log levels, overridable through `RUST_LOG`
//! - Console output, plain or JSON
//! - Local JSON file logging with rotation
//!
//! # Example
//!
//! ```no_run
//! use wardsync::logging::init_logging;
//! use wardsync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a message whose command was applied or was a no-op
///
/// # Example
///
/// ```no_run
/// use wardsync::log_message_applied;
/// use wardsync::core::classify::Intent;
///
/// log_message_applied!(4223045829_i64, 2_i64, Intent::Transfer, "closed stay 1; opened stay 2");
/// ```
#[macro_export]
macro_rules! log_message_applied {
    ($visit_id:expr, $movement_id:expr, $intent:expr, $detail:expr) => {
        tracing::info!(
            visit_id = %$visit_id,
            movement_id = %$movement_id,
            intent = %$intent,
            detail = %$detail,
            "Message applied"
        );
    };
}

/// Log a message that could not be decoded or applied
///
/// # Example
///
/// ```no_run
/// use wardsync::log_message_failed;
///
/// log_message_failed!("adt_0001.hl7", 3_usize, "PV1-44 is not a timestamp");
/// ```
#[macro_export]
macro_rules! log_message_failed {
    ($file:expr, $index:expr, $error:expr) => {
        tracing::error!(
            file = %$file,
            index = $index,
            error = %$error,
            "Message failed"
        );
    };
}

/// Log progress through the ordered batch
///
/// # Example
///
/// ```no_run
/// use wardsync::log_batch_progress;
///
/// log_batch_progress!(100, 1000);
/// ```
#[macro_export]
macro_rules! log_batch_progress {
    ($current:expr, $total:expr) => {
        tracing::debug!(
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / $total as f64 * 100.0),
            "Applying batch"
        );
    };
}
