//! Stay store factory
//!
//! This module creates the stay store selected by the configuration.

use crate::adapters::memory::MemoryStore;
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::store::traits::StayStore;
use crate::config::schema::{DatabaseTarget, WardsyncConfig};
use crate::domain::{Result, WardsyncError};
use std::sync::Arc;

/// Create a stay store based on the configuration
///
/// This factory function examines the `database_target` in the configuration
/// and creates the matching store. No connection is opened here; call
/// [`StayStore::test_connection`] to verify reachability.
///
/// # Arguments
///
/// * `config` - The Wardsync configuration
///
/// # Errors
///
/// Returns an error if the PostgreSQL section is missing or the client
/// cannot be created.
pub async fn create_stay_store(config: &WardsyncConfig) -> Result<Arc<dyn StayStore>> {
    match config.database_target {
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                WardsyncError::Configuration(
                    "postgresql configuration is required when database_target = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL stay store");
            let client = PostgreSQLClient::new(pg_config.clone()).await?;
            Ok(Arc::new(PostgreSQLAdapter::new(client)) as Arc<dyn StayStore>)
        }
        DatabaseTarget::Memory => {
            tracing::warn!("Using the in-memory stay store, nothing is persisted after exit");
            Ok(Arc::new(MemoryStore::new()) as Arc<dyn StayStore>)
        }
    }
}
