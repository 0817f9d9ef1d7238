//! Storage integrations for Wardsync.
//!
//! This module provides the stay store port and its backends:
//!
//! - [`store`] - Store abstraction layer (trait-based) and factory
//! - [`postgresql`] - PostgreSQL implementation
//! - [`memory`] - In-memory implementation for dry runs and tests
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate the database driver and
//! enable testing without a server. The reconciliation engine only sees
//! [`store::StayStore`] and [`store::StoreTransaction`].
//!
//! ```rust,no_run
//! use wardsync::adapters::postgresql::{PostgreSQLAdapter, PostgreSQLClient};
//! use wardsync::adapters::store::StayStore;
//! use wardsync::config::{secret_connection_string, PostgreSQLConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PostgreSQLConfig {
//!     connection_string: secret_connection_string("postgresql://wardsync@localhost/beds"),
//!     max_connections: 10,
//!     connection_timeout_seconds: 30,
//!     statement_timeout_seconds: 60,
//!     ssl_mode: "prefer".to_string(),
//! };
//!
//! let store = PostgreSQLAdapter::new(PostgreSQLClient::new(config).await?);
//! store.test_connection().await?;
//! store.ensure_schema().await?;
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgresql;
pub mod store;
