//! Integration tests for configuration loading and validation
//!
//! Tests that modify environment variables hold `ENV_MUTEX` to avoid
//! interference between tests.

use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;
use wardsync::config::{load_config, DatabaseTarget};
use wardsync::core::ingest::MalformedPolicy;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("WARDSYNC_APPLICATION_LOG_LEVEL");
    std::env::remove_var("WARDSYNC_INGEST_DIRECTORY");
    std::env::remove_var("WARDSYNC_INGEST_MALFORMED_POLICY");
    std::env::remove_var("WARDSYNC_INGEST_DRY_RUN");
    std::env::remove_var("WARDSYNC_POSTGRESQL_MAX_CONNECTIONS");
    std::env::remove_var("TEST_WARDSYNC_PG_PASSWORD");
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
database_target = "postgresql"

[application]
log_level = "debug"

[ingest]
directory = "/var/spool/hl7"
extension = "adt"
malformed_policy = "hold_file"
dry_run = true
location_validity_days = 14

[postgresql]
connection_string = "postgresql://wardsync:secret@db:5432/beds"
max_connections = 5
ssl_mode = "require"

[logging]
local_enabled = true
local_path = "/tmp/wardsync-logs"
local_rotation = "hourly"
json = true
"#,
    );

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.database_target, DatabaseTarget::PostgreSQL);
    assert_eq!(config.ingest.directory, "/var/spool/hl7");
    assert_eq!(config.ingest.extension, "adt");
    assert_eq!(config.ingest.malformed_policy, MalformedPolicy::HoldFile);
    assert!(config.ingest.dry_run);
    assert_eq!(config.ingest.location_validity_days, 14);

    let pg = config.postgresql.unwrap();
    assert_eq!(pg.max_connections, 5);
    assert_eq!(pg.connection_timeout_seconds, 30);
    assert_eq!(pg.statement_timeout_seconds, 60);
    assert_eq!(pg.ssl_mode, "require");

    assert!(config.logging.local_enabled);
    assert_eq!(config.logging.local_rotation, "hourly");
    assert!(config.logging.json);
}

#[test]
fn test_load_minimal_config_uses_defaults() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
database_target = "memory"

[ingest]
directory = "/var/spool/hl7"
"#,
    );

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.ingest.extension, "hl7");
    assert_eq!(config.ingest.malformed_policy, MalformedPolicy::Skip);
    assert!(!config.ingest.dry_run);
    assert_eq!(config.ingest.location_validity_days, 7);
    assert!(config.postgresql.is_none());
    assert!(!config.logging.local_enabled);
}

#[test]
fn test_env_var_substitution_in_connection_string() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_WARDSYNC_PG_PASSWORD", "from-env");

    let file = write_config(
        r#"
database_target = "postgresql"

[ingest]
directory = "/var/spool/hl7"

[postgresql]
# password comes from ${TEST_WARDSYNC_PG_PASSWORD}
connection_string = "postgresql://wardsync:${TEST_WARDSYNC_PG_PASSWORD}@db/beds"
"#,
    );

    let config = load_config(file.path()).unwrap();
    let pg = config.postgresql.unwrap();
    assert_eq!(
        pg.connection_string.expose_secret().as_str(),
        "postgresql://wardsync:from-env@db/beds"
    );

    cleanup_env_vars();
}

#[test]
fn test_missing_env_var_is_reported() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
database_target = "postgresql"

[ingest]
directory = "/var/spool/hl7"

[postgresql]
connection_string = "postgresql://wardsync:${TEST_WARDSYNC_PG_PASSWORD}@db/beds"
"#,
    );

    let err = load_config(file.path()).unwrap_err().to_string();
    assert!(err.contains("TEST_WARDSYNC_PG_PASSWORD"));
}

#[test]
fn test_env_overrides() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("WARDSYNC_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("WARDSYNC_INGEST_DIRECTORY", "/srv/feed");
    std::env::set_var("WARDSYNC_INGEST_MALFORMED_POLICY", "abort_batch");
    std::env::set_var("WARDSYNC_INGEST_DRY_RUN", "true");

    let file = write_config(
        r#"
database_target = "memory"

[ingest]
directory = "/var/spool/hl7"
"#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.ingest.directory, "/srv/feed");
    assert_eq!(config.ingest.malformed_policy, MalformedPolicy::AbortBatch);
    assert!(config.ingest.dry_run);

    cleanup_env_vars();
}

#[test]
fn test_invalid_override_fails() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("WARDSYNC_INGEST_DRY_RUN", "sometimes");

    let file = write_config(
        r#"
database_target = "memory"

[ingest]
directory = "/var/spool/hl7"
"#,
    );

    assert!(load_config(file.path()).is_err());
    cleanup_env_vars();
}

#[test]
fn test_validation_errors() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let cases = [
        // postgresql section missing
        "database_target = \"postgresql\"\n[ingest]\ndirectory = \"/in\"\n",
        // leading dot in extension
        "database_target = \"memory\"\n[ingest]\ndirectory = \"/in\"\nextension = \".hl7\"\n",
        // validity window out of range
        "database_target = \"memory\"\n[ingest]\ndirectory = \"/in\"\nlocation_validity_days = 0\n",
        // unknown rotation
        "database_target = \"memory\"\n[ingest]\ndirectory = \"/in\"\n[logging]\nlocal_rotation = \"weekly\"\n",
        // unknown policy
        "database_target = \"memory\"\n[ingest]\ndirectory = \"/in\"\nmalformed_policy = \"retry\"\n",
    ];

    for content in cases {
        let file = write_config(content);
        assert!(load_config(file.path()).is_err(), "accepted: {content}");
    }
}

#[test]
fn test_missing_file() {
    let err = load_config("/nonexistent/wardsync.toml").unwrap_err();
    assert!(err.to_string().contains("not found"));
}
