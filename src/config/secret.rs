//! Protected PostgreSQL connection strings
//!
//! The DSN carries the database password, so it is kept in a
//! [`secrecy::Secret`] that zeroizes on drop and prints as `[REDACTED]`. Code
//! that needs to show where wardsync connects uses
//! [`ConnectionString::redacted`], which keeps host, port and database and
//! masks the user info. Serializing a config writes the redacted form.
//!
//! ```rust
//! use secrecy::ExposeSecret;
//! use wardsync::config::secret_connection_string;
//!
//! let dsn = secret_connection_string("postgresql://wardsync:pw@db:5432/beds");
//! assert_eq!(dsn.expose_secret().redacted(), "postgresql://***@db:5432/beds");
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

const SCHEMES: [&str; 2] = ["postgresql://", "postgres://"];

/// A libpq-style PostgreSQL URL
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct ConnectionString(String);

impl CloneableSecret for ConnectionString {}
impl DebugSecret for ConnectionString {}
impl SerializableSecret for ConnectionString {}

/// Connection string as stored in [`crate::config::PostgreSQLConfig`]
pub type SecretConnectionString = Secret<ConnectionString>;

/// Wraps a DSN read from the config file or the environment
pub fn secret_connection_string(value: impl Into<String>) -> SecretConnectionString {
    Secret::new(ConnectionString(value.into()))
}

impl ConnectionString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Whether the URL uses `postgresql://` or `postgres://`
    pub fn has_postgres_scheme(&self) -> bool {
        SCHEMES.iter().any(|scheme| self.0.starts_with(scheme))
    }

    /// The URL with user and password replaced by `***`
    ///
    /// The password may itself contain `@`, so the host part starts after
    /// the last one.
    pub fn redacted(&self) -> String {
        let rest = SCHEMES
            .iter()
            .find_map(|scheme| self.0.strip_prefix(scheme))
            .unwrap_or(&self.0);

        match rest.rsplit_once('@') {
            Some((_, host)) => format!("postgresql://***@{host}"),
            None => format!("postgresql://{rest}"),
        }
    }
}

impl AsRef<str> for ConnectionString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ConnectionString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl Serialize for ConnectionString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.redacted())
    }
}

impl<'de> Deserialize<'de> for ConnectionString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(ConnectionString)
    }
}
