//! PostgreSQL stay store
//!
//! This module provides the PostgreSQL backend: a pooled client, row
//! mapping and the [`StayStore`](crate::adapters::store::StayStore)
//! implementation.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::{PostgreSQLAdapter, PostgreSQLTransaction};
pub use client::PostgreSQLClient;
