//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Wardsync configuration file.

use crate::config::load_config;
use crate::config::schema::DatabaseTarget;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// `load_config` validates as part of loading, so a load failure covers
    /// both syntax and semantic errors.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                println!();
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Input Directory: {}", config.ingest.directory);
        println!("  Extension: {}", config.ingest.extension);
        println!("  Malformed Policy: {}", config.ingest.malformed_policy);
        println!("  Dry Run: {}", config.ingest.dry_run);
        println!(
            "  Location Validity: {} days",
            config.ingest.location_validity_days
        );
        println!("  Database Target: {}", config.database_target.as_str());

        if config.database_target == DatabaseTarget::PostgreSQL {
            if let Some(ref pg_config) = config.postgresql {
                println!(
                    "  PostgreSQL Connection: {}",
                    pg_config.connection_string.expose_secret().redacted()
                );
                println!("  Max Connections: {}", pg_config.max_connections);
                println!("  SSL Mode: {}", pg_config.ssl_mode);
            }
        }

        if config.logging.local_enabled {
            println!(
                "  File Logging: {} ({})",
                config.logging.local_path, config.logging.local_rotation
            );
        }
        println!();
        Ok(0)
    }
}
