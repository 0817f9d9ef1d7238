//! Domain error types
//!
//! This module defines the error hierarchy for Wardsync. Every error is
//! domain-specific; third-party error types are converted to strings at the
//! adapter boundary and never leak through the public API.

use std::path::PathBuf;
use thiserror::Error;

/// Main Wardsync error type
///
/// This is the primary error type used throughout the application.
/// It wraps the specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum WardsyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HL7 parsing errors
    #[error("HL7 error: {0}")]
    Hl7(#[from] Hl7Error),

    /// Storage-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Batch ingestion errors
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// HL7 message errors
///
/// Raised while splitting, parsing or classifying a single message. The batch
/// treats every variant as a per-message failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Hl7Error {
    /// The message text is not a parseable HL7 message
    #[error("Malformed message: {reason}")]
    MalformedMessage { reason: String },

    /// A segment required by the message's intent is absent
    #[error("Malformed message: missing required segment {0}")]
    MissingSegment(&'static str),

    /// A field does not match its expected format
    #[error("Malformed field {field}: '{value}' (expected {expected})")]
    MalformedField {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Hl7Error {
    /// Creates a malformed field error
    pub fn field(field: &'static str, value: impl Into<String>, expected: &'static str) -> Self {
        Self::MalformedField {
            field,
            value: value.into(),
            expected,
        }
    }

    /// Creates a malformed message error
    pub fn message(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }
}

/// Storage errors
///
/// Errors raised by the stay store adapters.
/// These errors don't expose the PostgreSQL driver types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to connect to the store
    #[error("Failed to connect to store: {0}")]
    ConnectionFailed(String),

    /// A query or statement failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Uniqueness or parent/child conflict on create
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Begin, commit or rollback failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Batch ingestion errors
#[derive(Debug, Error)]
pub enum IngestError {
    /// The input directory cannot be listed
    #[error("Cannot read directory {path}: {reason}")]
    DirectoryUnreadable { path: PathBuf, reason: String },

    /// A batch file cannot be read
    #[error("Cannot read file {path}: {reason}")]
    FileUnreadable { path: PathBuf, reason: String },

    /// A malformed message aborted the batch under the abort policy
    #[error("Batch aborted by malformed message in {path}: {reason}")]
    Aborted { path: PathBuf, reason: String },

    /// Another run holds the directory lock
    #[error("Another ingest run holds the lock {0}")]
    LockHeld(PathBuf),

    /// A consumed file could not be removed
    #[error("Failed to remove {path}: {reason}")]
    RemoveFailed { path: PathBuf, reason: String },
}

/// Per-message failure detail
///
/// Attached to the ingest summary for every message that was skipped or
/// failed to apply.
#[derive(Debug, Clone)]
pub struct MessageErrorDetail {
    /// Source file of the message
    pub file: Option<PathBuf>,

    /// Position of the message inside its file (0-based)
    pub index: Option<usize>,

    /// Visit the message referenced, when known
    pub visit_id: Option<i64>,

    /// Error message
    pub message: String,
}

impl MessageErrorDetail {
    /// Creates a new message error detail
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            file: None,
            index: None,
            visit_id: None,
            message: message.into(),
        }
    }

    /// Sets the source file
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Sets the in-file position
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Sets the visit id
    pub fn with_visit_id(mut self, visit_id: i64) -> Self {
        self.visit_id = Some(visit_id);
        self
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for WardsyncError {
    fn from(err: std::io::Error) -> Self {
        WardsyncError::Io(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for WardsyncError {
    fn from(err: toml::de::Error) -> Self {
        WardsyncError::Configuration(format!("TOML parse error: {err}"))
    }
}
