//! Ingest coordinator - main orchestrator for one batch run
//!
//! Locks the input directory, decodes and orders every file, applies the
//! commands one at a time and finally deletes the consumed files.

use crate::adapters::store::StayStore;
use crate::config::IngestConfig;
use crate::core::ingest::batch::{BatchReader, DecodedBatch, MalformedPolicy};
use crate::core::ingest::lock::RunLock;
use crate::core::ingest::summary::IngestSummary;
use crate::core::reconcile::{ApplyOutcome, LocationResolver, ReconciliationEngine};
use crate::domain::errors::{IngestError, MessageErrorDetail};
use crate::domain::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Per-run settings
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub directory: PathBuf,
    pub extension: String,
    pub malformed_policy: MalformedPolicy,
    pub dry_run: bool,
    pub location_validity_days: u32,
}

impl IngestOptions {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            directory: PathBuf::from(&config.directory),
            extension: config.extension.clone(),
            malformed_policy: config.malformed_policy,
            dry_run: config.dry_run,
            location_validity_days: config.location_validity_days,
        }
    }
}

/// Ingest coordinator
pub struct IngestCoordinator {
    engine: ReconciliationEngine,
    options: IngestOptions,
    shutdown_signal: watch::Receiver<bool>,
}

impl IngestCoordinator {
    /// Create a new ingest coordinator
    ///
    /// # Arguments
    ///
    /// * `store` - Store the batch is applied to
    /// * `options` - Input directory and run settings
    /// * `shutdown_signal` - Set to `true` when the process should stop
    pub fn new(
        store: Arc<dyn StayStore>,
        options: IngestOptions,
        shutdown_signal: watch::Receiver<bool>,
    ) -> Self {
        let resolver = LocationResolver::new(options.location_validity_days);
        Self {
            engine: ReconciliationEngine::new(store, resolver),
            options,
            shutdown_signal,
        }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Execute one batch
    ///
    /// This is the main entry point of an ingest run. It:
    /// 1. Acquires the directory run lock
    /// 2. Reads, decodes and orders every input file
    /// 3. Stops here on dry-run or when a shutdown was requested
    /// 4. Applies the commands in order, one transaction each
    /// 5. Deletes the consumed files
    ///
    /// # Errors
    ///
    /// Fails before any mutation when the lock is held, a file cannot be read
    /// or the abort policy hits a malformed message. Fails after application
    /// when a consumed file cannot be removed. A message that fails to apply
    /// is counted in the summary and does not fail the run.
    pub async fn run(&self) -> Result<IngestSummary> {
        let start_time = Instant::now();
        let mut summary = IngestSummary::new();
        summary.dry_run = self.options.dry_run;

        let _lock = RunLock::acquire(&self.options.directory)?;

        tracing::info!(
            directory = %self.options.directory.display(),
            extension = %self.options.extension,
            malformed_policy = %self.options.malformed_policy,
            dry_run = self.options.dry_run,
            backend = self.engine.store().backend(),
            "Starting ingest run"
        );

        let reader = BatchReader::new(
            &self.options.directory,
            &self.options.extension,
            self.options.malformed_policy,
        );
        let batch = reader.read()?;

        summary.files_read = batch.files.len();
        summary.files_held = batch.held_files();
        summary.messages_queued = batch.messages.len();
        summary.unsupported = batch.unsupported;
        summary.malformed = batch.malformed.len();
        for error in &batch.malformed {
            summary.add_error(error.clone());
        }

        if *self.shutdown_signal.borrow() {
            tracing::warn!("Shutdown requested, stopping before the batch is applied");
            summary.interrupted = true;
            return Ok(self.finish(summary, start_time));
        }

        if self.options.dry_run {
            for queued in &batch.messages {
                tracing::info!(
                    file = %queued.file.display(),
                    index = queued.index,
                    intent = %queued.message.command.intent(),
                    visit_id = ?queued.message.command.visit_id().map(|v| v.get()),
                    created_at = %queued.message.created_at,
                    "Dry run: would apply"
                );
            }
            return Ok(self.finish(summary, start_time));
        }

        self.apply_batch(&batch, &mut summary).await;
        let removal = self.remove_consumed(&batch, &mut summary);

        let summary = self.finish(summary, start_time);
        removal?;
        Ok(summary)
    }

    async fn apply_batch(&self, batch: &DecodedBatch, summary: &mut IngestSummary) {
        let total = batch.messages.len();

        for (position, queued) in batch.messages.iter().enumerate() {
            crate::log_batch_progress!(position + 1, total);
            let command = &queued.message.command;

            match self.engine.apply(command).await {
                Ok(outcome) => {
                    let detail = match &outcome {
                        ApplyOutcome::Applied { effects, .. } => {
                            summary.applied += 1;
                            effects
                                .iter()
                                .map(ToString::to_string)
                                .collect::<Vec<_>>()
                                .join("; ")
                        }
                        ApplyOutcome::NoOp { reason, .. } => {
                            summary.no_ops += 1;
                            format!("no-op: {reason}")
                        }
                    };
                    crate::log_message_applied!(
                        display_id(command.visit_id().map(|v| v.get())),
                        display_id(command.movement_id().map(|m| m.get())),
                        outcome.intent(),
                        detail
                    );
                }
                Err(e) => {
                    crate::log_message_failed!(queued.file.display(), queued.index, e);
                    summary.failed += 1;
                    let mut detail = MessageErrorDetail::new(e.to_string())
                        .with_file(queued.file.clone())
                        .with_index(queued.index);
                    if let Some(visit_id) = command.visit_id() {
                        detail = detail.with_visit_id(visit_id.get());
                    }
                    summary.add_error(detail);
                }
            }
        }
    }

    fn remove_consumed(&self, batch: &DecodedBatch, summary: &mut IngestSummary) -> Result<()> {
        let mut first_failure = None;

        for file in batch.consumable_files() {
            match std::fs::remove_file(&file.path) {
                Ok(()) => {
                    summary.files_deleted += 1;
                    tracing::debug!(
                        file = %file.path.display(),
                        sha256 = %file.fingerprint,
                        "Removed consumed file"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        file = %file.path.display(),
                        error = %e,
                        "Failed to remove consumed file"
                    );
                    first_failure.get_or_insert(IngestError::RemoveFailed {
                        path: file.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        match first_failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn finish(&self, summary: IngestSummary, start_time: Instant) -> IngestSummary {
        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        summary
    }
}

fn display_id(id: Option<i64>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}
