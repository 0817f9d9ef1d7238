//! Core business logic for Wardsync.
//!
//! # Modules
//!
//! - [`classify`] - Message classification into typed commands
//! - [`reconcile`] - Stay reconciliation against the store
//! - [`ingest`] - Directory batches, ordering and run coordination
//!
//! # Ingest Workflow
//!
//! 1. **Lock**: Take the run lock of the input directory
//! 2. **Decode**: Split files into messages and classify them
//! 3. **Order**: Merge all messages by MSH-7 creation time
//! 4. **Apply**: Run each command in its own store transaction
//! 5. **Clean up**: Delete the consumed files
//! 6. **Report**: Log the ingest summary
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wardsync::adapters::memory::MemoryStore;
//! use wardsync::config::load_config;
//! use wardsync::core::ingest::{IngestCoordinator, IngestOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("wardsync.toml")?;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let coordinator = IngestCoordinator::new(
//!     Arc::new(MemoryStore::new()),
//!     IngestOptions::from_config(&config.ingest),
//!     shutdown_rx,
//! );
//!
//! let summary = coordinator.run().await?;
//! println!("Applied: {}", summary.applied);
//! println!("Failed: {}", summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod ingest;
pub mod reconcile;
