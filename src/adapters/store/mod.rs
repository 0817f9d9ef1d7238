//! Storage abstraction layer
//!
//! This module provides a trait-based abstraction for the stay store,
//! allowing Wardsync to run against PostgreSQL or an in-memory backend.

pub mod factory;
pub mod traits;

pub use factory::create_stay_store;
pub use traits::{StayStore, StoreTransaction, VisitHistory};
