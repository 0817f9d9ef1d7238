//! Ingest summary and reporting

use crate::domain::errors::MessageErrorDetail;
use std::time::Duration;

/// Summary of one ingest run
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    /// Files found in the input directory
    pub files_read: usize,

    /// Files deleted after the batch was applied
    pub files_deleted: usize,

    /// Files left on disk under the hold policy
    pub files_held: usize,

    /// Supported messages queued for application
    pub messages_queued: usize,

    /// Commands that changed the store
    pub applied: usize,

    /// Commands that were valid no-ops
    pub no_ops: usize,

    /// Commands whose transaction failed
    pub failed: usize,

    /// Messages of an ignored type
    pub unsupported: usize,

    /// Messages that could not be parsed or classified
    pub malformed: usize,

    /// Decoded only; nothing applied or deleted
    pub dry_run: bool,

    /// A shutdown signal stopped the run before the apply phase
    pub interrupted: bool,

    pub duration: Duration,

    pub errors: Vec<MessageErrorDetail>,
}

impl IngestSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn add_error(&mut self, error: MessageErrorDetail) {
        self.errors.push(error);
    }

    /// No message failed to decode or apply
    pub fn is_successful(&self) -> bool {
        self.failed == 0 && self.malformed == 0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            files_read = self.files_read,
            files_deleted = self.files_deleted,
            files_held = self.files_held,
            queued = self.messages_queued,
            applied = self.applied,
            no_ops = self.no_ops,
            failed = self.failed,
            unsupported = self.unsupported,
            malformed = self.malformed,
            dry_run = self.dry_run,
            interrupted = self.interrupted,
            duration_ms = self.duration.as_millis() as u64,
            "Ingest completed"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Ingest completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    file = ?error.file,
                    index = ?error.index,
                    visit_id = ?error.visit_id,
                    message = %error.message,
                    "Ingest error"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_is_successful() {
        let mut summary = IngestSummary::new();
        summary.applied = 10;
        summary.no_ops = 2;
        assert!(summary.is_successful());

        summary.malformed = 1;
        assert!(!summary.is_successful());

        summary.malformed = 0;
        summary.failed = 1;
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_summary_with_duration() {
        let summary = IngestSummary::new().with_duration(Duration::from_secs(3));
        assert_eq!(summary.duration, Duration::from_secs(3));
    }

    #[test]
    fn test_summary_add_error() {
        let mut summary = IngestSummary::new();
        summary.add_error(MessageErrorDetail::new("store unavailable").with_visit_id(7));
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].visit_id, Some(7));
    }
}
