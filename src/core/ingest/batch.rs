//! Batch reading and ordering
//!
//! Lists the input directory, decodes every file into classified messages and
//! merges them into one sequence ordered by message creation time.

use crate::core::classify::{decode_message, ClassifiedMessage, Decoded};
use crate::domain::errors::{IngestError, MessageErrorDetail};
use crate::domain::Result;
use crate::hl7;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How a file containing an unparseable message is treated
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Skip the message; the file is still consumed
    #[default]
    Skip,
    /// Drop every message of the file and leave it on disk
    HoldFile,
    /// Stop the run before any mutation or deletion
    AbortBatch,
}

impl MalformedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MalformedPolicy::Skip => "skip",
            MalformedPolicy::HoldFile => "hold_file",
            MalformedPolicy::AbortBatch => "abort_batch",
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(MalformedPolicy::Skip),
            "hold_file" => Ok(MalformedPolicy::HoldFile),
            "abort_batch" => Ok(MalformedPolicy::AbortBatch),
            other => Err(format!(
                "malformed_policy must be 'skip', 'hold_file', or 'abort_batch', got '{other}'"
            )),
        }
    }
}

/// Hex SHA-256 of a file body
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// One input file of the batch
#[derive(Debug, Clone)]
pub struct BatchFile {
    pub path: PathBuf,

    /// SHA-256 of the raw bytes
    pub fingerprint: String,

    /// Number of messages found in the file
    pub message_count: usize,

    /// Left on disk because of a malformed message
    pub held: bool,
}

/// A supported message with its position in the input
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub file: PathBuf,
    pub index: usize,
    pub message: ClassifiedMessage,
}

/// Every file and supported message of one run
#[derive(Debug, Default)]
pub struct DecodedBatch {
    pub files: Vec<BatchFile>,

    /// Supported messages, ordered by MSH-7
    pub messages: Vec<QueuedMessage>,

    /// Messages of a type the engine ignores
    pub unsupported: usize,

    /// Messages that failed to parse or classify
    pub malformed: Vec<MessageErrorDetail>,
}

impl DecodedBatch {
    /// Files that may be deleted once the batch has been applied
    pub fn consumable_files(&self) -> impl Iterator<Item = &BatchFile> {
        self.files.iter().filter(|f| !f.held)
    }

    pub fn held_files(&self) -> usize {
        self.files.iter().filter(|f| f.held).count()
    }
}

/// Stable sort by creation time
///
/// Messages with equal timestamps keep their file-then-in-file order.
pub fn order_messages(messages: &mut [QueuedMessage]) {
    messages.sort_by_key(|m| m.message.created_at);
}

/// Reads and decodes the files of an input directory
pub struct BatchReader {
    directory: PathBuf,
    extension: String,
    policy: MalformedPolicy,
}

impl BatchReader {
    /// Create a new batch reader
    ///
    /// # Arguments
    ///
    /// * `directory` - Input directory
    /// * `extension` - File extension without the leading dot, matched case-insensitively
    /// * `policy` - Treatment of files with malformed messages
    pub fn new(directory: impl Into<PathBuf>, extension: &str, policy: MalformedPolicy) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.trim_start_matches('.').to_lowercase(),
            policy,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Input files sorted by file name
    pub fn list_files(&self) -> Result<Vec<PathBuf>> {
        let unreadable = |e: std::io::Error| IngestError::DirectoryUnreadable {
            path: self.directory.clone(),
            reason: e.to_string(),
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.directory).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            if path.is_file() && self.matches_extension(&path) {
                files.push(path);
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.to_lowercase() == self.extension)
    }

    /// Decode every input file into one ordered batch
    ///
    /// # Errors
    ///
    /// Fails the whole batch when the directory or any file cannot be read,
    /// or when a malformed message is found under
    /// [`MalformedPolicy::AbortBatch`].
    pub fn read(&self) -> Result<DecodedBatch> {
        let mut batch = DecodedBatch::default();

        for path in self.list_files()? {
            let bytes = std::fs::read(&path).map_err(|e| IngestError::FileUnreadable {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            self.decode_file(path, &bytes, &mut batch)?;
        }

        order_messages(&mut batch.messages);
        Ok(batch)
    }

    fn decode_file(&self, path: PathBuf, bytes: &[u8], batch: &mut DecodedBatch) -> Result<()> {
        let fingerprint = fingerprint(bytes);
        let (texts, orphaned) = hl7::split_file(bytes);

        tracing::info!(
            file = %path.display(),
            sha256 = %fingerprint,
            messages = texts.len(),
            "Read input file"
        );
        if orphaned > 0 {
            tracing::warn!(
                file = %path.display(),
                segments = orphaned,
                "Ignoring segments before the first MSH"
            );
        }

        let mut queued = Vec::new();
        let mut malformed = false;

        for (index, text) in texts.iter().enumerate() {
            match decode_message(text) {
                Ok(Decoded::Supported(message)) => queued.push(QueuedMessage {
                    file: path.clone(),
                    index,
                    message,
                }),
                Ok(Decoded::Unsupported {
                    message_type,
                    trigger_event,
                }) => {
                    tracing::debug!(
                        file = %path.display(),
                        index,
                        message_type = %message_type,
                        trigger_event = %trigger_event,
                        "Skipping unsupported message"
                    );
                    batch.unsupported += 1;
                }
                Err(e) => {
                    crate::log_message_failed!(path.display(), index, e);
                    if self.policy == MalformedPolicy::AbortBatch {
                        return Err(IngestError::Aborted {
                            path,
                            reason: e.to_string(),
                        }
                        .into());
                    }
                    malformed = true;
                    batch.malformed.push(
                        MessageErrorDetail::new(e.to_string())
                            .with_file(path.clone())
                            .with_index(index),
                    );
                }
            }
        }

        let held = malformed && self.policy == MalformedPolicy::HoldFile;
        if held {
            tracing::warn!(
                file = %path.display(),
                dropped = queued.len(),
                "Holding file with malformed message"
            );
        } else {
            batch.messages.extend(queued);
        }

        batch.files.push(BatchFile {
            path,
            fingerprint,
            message_count: texts.len(),
            held,
        });
        Ok(())
    }
}
