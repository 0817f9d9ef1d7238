//! In-memory storage backend
//!
//! This module provides a process-local implementation of the stay store.

pub mod store;

pub use store::MemoryStore;
