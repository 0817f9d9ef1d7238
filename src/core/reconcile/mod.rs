//! Stay reconciliation
//!
//! Turns classified ADT commands into stay, discharge and visit mutations.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wardsync::adapters::memory::MemoryStore;
//! use wardsync::core::classify::{decode_message, Decoded};
//! use wardsync::core::reconcile::{LocationResolver, ReconciliationEngine};
//!
//! # async fn example(text: &str) -> wardsync::domain::Result<()> {
//! let engine = ReconciliationEngine::new(Arc::new(MemoryStore::new()), LocationResolver::default());
//!
//! if let Decoded::Supported(message) = decode_message(text)? {
//!     let outcome = engine.apply(&message.command).await?;
//!     println!("{:?}", outcome);
//! }
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod outcome;
pub mod resolver;

pub use engine::ReconciliationEngine;
pub use outcome::{ApplyOutcome, Effect, NoOpReason};
pub use resolver::{LocationResolver, ResolvedLocation, DEFAULT_LOCATION_VALIDITY_DAYS};
