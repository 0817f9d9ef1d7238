//! Ingest command implementation
//!
//! This module implements the `ingest` command, which applies one batch of
//! HL7 files from the input directory to the configured stay store.

use crate::adapters::store::create_stay_store;
use crate::config::load_config;
use crate::core::ingest::{IngestCoordinator, IngestOptions, IngestSummary, MalformedPolicy};
use crate::domain::{IngestError, WardsyncError};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Override the input directory
    #[arg(long)]
    pub dir: Option<String>,

    /// Dry run mode - decode and order without touching the store or the files
    #[arg(long)]
    pub dry_run: bool,

    /// Override the treatment of files with a malformed message
    #[arg(long, value_enum)]
    pub malformed_policy: Option<MalformedPolicy>,
}

impl IngestArgs {
    /// Execute the ingest command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting ingest command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Some(dir) = &self.dir {
            tracing::info!(directory = %dir, "Overriding input directory from CLI");
            config.ingest.directory = dir.clone();
        }

        if let Some(policy) = self.malformed_policy {
            tracing::info!(malformed_policy = %policy, "Overriding malformed policy from CLI");
            config.ingest.malformed_policy = policy;
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.ingest.dry_run = true;
        }

        if let Err(e) = config.validate_for_ingest() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        if config.ingest.dry_run {
            println!("🔍 DRY RUN MODE - Nothing will be written or deleted");
            println!();
        }

        let store = match create_stay_store(&config).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create stay store");
                eprintln!("Failed to initialize store: {e}");
                return Ok(4);
            }
        };

        if !config.ingest.dry_run {
            if let Err(e) = store.test_connection().await {
                tracing::error!(error = %e, "Store connection failed");
                eprintln!("Failed to connect to store: {e}");
                return Ok(4);
            }

            if let Err(e) = store.ensure_schema().await {
                tracing::error!(error = %e, "Schema setup failed");
                eprintln!("Failed to prepare store schema: {e}");
                return Ok(4);
            }
        }

        let coordinator = IngestCoordinator::new(
            store,
            IngestOptions::from_config(&config.ingest),
            shutdown_signal,
        );

        println!(
            "🚀 Ingesting *.{} from {}",
            config.ingest.extension, config.ingest.directory
        );
        println!();

        let summary = match coordinator.run().await {
            Ok(s) => s,
            Err(WardsyncError::Ingest(IngestError::LockHeld(path))) => {
                tracing::error!(lock = %path.display(), "Another run holds the lock");
                eprintln!("Another run is in progress (lock {})", path.display());
                return Ok(3);
            }
            Err(e) => {
                tracing::error!(error = %e, "Ingest failed");
                eprintln!("Ingest failed: {e}");
                return Ok(5);
            }
        };

        print_summary(&summary);
        Ok(exit_code(&summary))
    }
}

fn print_summary(summary: &IngestSummary) {
    println!("📊 Ingest Summary:");
    println!("  Files read: {}", summary.files_read);
    println!("  Files deleted: {}", summary.files_deleted);
    println!("  Files held: {}", summary.files_held);
    println!("  Messages queued: {}", summary.messages_queued);
    println!("  Applied: {}", summary.applied);
    println!("  No-ops: {}", summary.no_ops);
    println!("  Failed: {}", summary.failed);
    println!("  Unsupported: {}", summary.unsupported);
    println!("  Malformed: {}", summary.malformed);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();

    if !summary.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in &summary.errors {
            let location = match (&error.file, error.index) {
                (Some(file), Some(index)) => format!("{}#{index}", file.display()),
                (Some(file), None) => file.display().to_string(),
                _ => "-".to_string(),
            };
            println!("  - {location}: {}", error.message);
        }
        println!();
    }
}

fn exit_code(summary: &IngestSummary) -> i32 {
    if summary.interrupted {
        println!("⚠️  Ingest interrupted before the batch was applied. Files were kept.");
        tracing::info!("Ingest interrupted by user signal");
        130
    } else if summary.is_successful() {
        println!("✅ Ingest completed successfully!");
        0
    } else {
        println!("⚠️  Ingest completed with failures");
        1
    }
}
