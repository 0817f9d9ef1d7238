//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::WardsyncConfig;
use crate::config::secret_connection_string;
use crate::domain::errors::WardsyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into WardsyncConfig
/// 4. Applies environment variable overrides (WARDSYNC_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - A referenced environment variable is not set
/// - TOML parsing fails
/// - An override value cannot be parsed
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use wardsync::config::loader::load_config;
///
/// let config = load_config("wardsync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<WardsyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(WardsyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        WardsyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: WardsyncConfig = toml::from_str(&contents)
        .map_err(|e| WardsyncError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        WardsyncError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap())
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied unchanged. Every output line ends with `\n`.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = env_var_pattern();
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(WardsyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        WardsyncError::Configuration(format!("Invalid value for {name}: '{value}' ({e})"))
    })
}

/// Applies environment variable overrides using WARDSYNC_* prefix
///
/// Environment variables follow the pattern: WARDSYNC_<SECTION>_<KEY>
/// For example: WARDSYNC_INGEST_DIRECTORY, WARDSYNC_POSTGRESQL_MAX_CONNECTIONS
fn apply_env_overrides(config: &mut WardsyncConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("WARDSYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Ingest overrides
    if let Ok(val) = std::env::var("WARDSYNC_INGEST_DIRECTORY") {
        config.ingest.directory = val;
    }
    if let Ok(val) = std::env::var("WARDSYNC_INGEST_EXTENSION") {
        config.ingest.extension = val;
    }
    if let Ok(val) = std::env::var("WARDSYNC_INGEST_MALFORMED_POLICY") {
        config.ingest.malformed_policy =
            parse_override("WARDSYNC_INGEST_MALFORMED_POLICY", &val)?;
    }
    if let Ok(val) = std::env::var("WARDSYNC_INGEST_DRY_RUN") {
        config.ingest.dry_run = parse_override("WARDSYNC_INGEST_DRY_RUN", &val)?;
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg_config) = config.postgresql {
        if let Ok(val) = std::env::var("WARDSYNC_POSTGRESQL_CONNECTION_STRING") {
            pg_config.connection_string = secret_connection_string(val);
        }
        if let Ok(val) = std::env::var("WARDSYNC_POSTGRESQL_MAX_CONNECTIONS") {
            pg_config.max_connections =
                parse_override("WARDSYNC_POSTGRESQL_MAX_CONNECTIONS", &val)?;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("WARDSYNC_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("WARDSYNC_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Ok(val) = std::env::var("WARDSYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
