//! Batch ingestion of ADT feed files
//!
//! This module provides the run loop around the reconciliation engine:
//! - Directory listing, decoding and ordering of messages
//! - The directory run lock
//! - Run coordination and the end-of-run summary

pub mod batch;
pub mod coordinator;
pub mod lock;
pub mod summary;

pub use batch::{BatchReader, DecodedBatch, MalformedPolicy};
pub use coordinator::{IngestCoordinator, IngestOptions};
pub use lock::RunLock;
pub use summary::IngestSummary;
