// Wardsync - HL7 ADT ingestion and bed-stay reconciliation
// Copyright (c) 2025 Wardsync Contributors
// Licensed under the MIT License

//! # Wardsync - HL7 ADT ingestion and bed-stay reconciliation
//!
//! Wardsync reads HL7 v2 ADT (Admit/Discharge/Transfer) feed files and
//! reconciles them into a queryable model of which visit occupied which
//! bed, and when.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Parsing** HL7 feed files (ISO-8859-1, `\n` or `\r` segment separators)
//! - **Classifying** messages into admissions, transfers, discharges, updates and cancellations
//! - **Ordering** a whole batch by message creation time across files
//! - **Reconciling** each command into patients, visits, locations, stays and discharges,
//!   one store transaction per message
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (classify, reconcile, ingest)
//! - [`hl7`] - HL7 v2 segment model
//! - [`adapters`] - Stay store port with PostgreSQL and in-memory backends
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wardsync::adapters::store::create_stay_store;
//! use wardsync::config::load_config;
//! use wardsync::core::ingest::{IngestCoordinator, IngestOptions};
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("wardsync.toml")?;
//!     let store = create_stay_store(&config).await?;
//!     store.ensure_schema().await?;
//!
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     let coordinator =
//!         IngestCoordinator::new(store, IngestOptions::from_config(&config.ingest), shutdown_rx);
//!
//!     let summary = coordinator.run().await?;
//!     println!("Applied {} messages", summary.applied);
//!     Ok(())
//! }
//! ```
//!
//! ## Applying a single command
//!
//! ```rust
//! use std::sync::Arc;
//! use wardsync::adapters::memory::MemoryStore;
//! use wardsync::core::classify::{decode_message, Decoded};
//! use wardsync::core::reconcile::{LocationResolver, ReconciliationEngine};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let message = format!(
//!     "MSH|^~\\&|HIS|KH|RCV|KH|20230101080000||ADT^A01|1|P|2.5\rPID|1|1441645||||Doe^Jane|19700304|F\rPV1|1|I|KAR1^R101^B1{}|4223045829{}|20230101080000|\rZBE|1|20230101080000\r",
//!     "|".repeat(15),
//!     "|".repeat(24),
//! );
//!
//! let Decoded::Supported(classified) = decode_message(&message)? else {
//!     unreachable!();
//! };
//!
//! let engine = ReconciliationEngine::new(Arc::new(MemoryStore::new()), LocationResolver::default());
//! let outcome = engine.apply(&classified.command).await?;
//! assert!(outcome.is_applied());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Wardsync uses the [`domain::WardsyncError`] type for all errors. A message
//! that fails to parse or apply is counted in the run summary and never stops
//! the batch.
//!
//! ## Logging
//!
//! Wardsync uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(visit_id = 4223045829_i64, "Stay opened");
//! warn!(file = "feed_0001.hl7", "Message skipped");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod hl7;
pub mod logging;
