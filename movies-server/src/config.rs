//! Datastore configuration loaded from the environment
//!
//! All five `DB_*` variables are required. Missing values are reported
//! together so a misconfigured deploy fails once with the full list.

use std::fmt;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;

/// Environment variables that must be present to reach the database.
pub const REQUIRED_VARS: [&str; 5] = ["DB_USERNAME", "DB_PASSWORD", "DB_HOST", "DB_PORT", "DB_NAME"];

/// Configuration error, fatal at startup
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required DB environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("DB_PORT must be a port number, got '{0}'")]
    InvalidPort(String),
}

/// Database credentials and location
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl DbConfig {
    /// Read the `DB_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = Vec::with_capacity(REQUIRED_VARS.len());
        let mut missing = Vec::new();

        for key in REQUIRED_VARS {
            match lookup(key).filter(|v| !v.is_empty()) {
                Some(v) => values.push(v),
                None => missing.push(key),
            }
        }

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let [username, password, host, port, database]: [String; 5] = values
            .try_into()
            .map_err(|_| ConfigError::Missing(REQUIRED_VARS.to_vec()))?;

        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort(port.clone()))?;

        Ok(Self {
            username,
            password,
            host,
            port,
            database,
        })
    }

    /// Typed connection options; credentials are never spliced into a URL.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

/// Connection pool limits.
///
/// sqlx keeps idle connections inside `max_connections`, so the idle
/// ceiling equals the open ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    /// Connections older than this are closed and replaced
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 25,
            max_lifetime: Duration::from_secs(5 * 60),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            ("DB_USERNAME", "movies"),
            ("DB_PASSWORD", "s3cr3t"),
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "5432"),
            ("DB_NAME", "moviedb"),
        ])
    }

    #[test]
    fn reads_all_values() {
        let vars = full_env();
        let config = DbConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.username, "movies");
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "moviedb");
    }

    #[test]
    fn reports_every_missing_variable() {
        let vars = env(&[("DB_USERNAME", "movies"), ("DB_HOST", "localhost")]);
        let err = DbConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();

        assert_eq!(
            err,
            ConfigError::Missing(vec!["DB_PASSWORD", "DB_PORT", "DB_NAME"])
        );
        assert!(err.to_string().contains("DB_PASSWORD, DB_PORT, DB_NAME"));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut vars = full_env();
        vars.insert("DB_PASSWORD".into(), String::new());
        let err = DbConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();

        assert_eq!(err, ConfigError::Missing(vec!["DB_PASSWORD"]));
    }

    #[test]
    fn rejects_non_numeric_port() {
        let mut vars = full_env();
        vars.insert("DB_PORT".into(), "postgres".into());
        let err = DbConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();

        assert_eq!(err, ConfigError::InvalidPort("postgres".into()));
    }

    #[test]
    fn debug_hides_password() {
        let vars = full_env();
        let config = DbConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        let rendered = format!("{:?}", config);

        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn default_pool_limits() {
        let settings = PoolSettings::default();
        assert_eq!(settings.max_connections, 25);
        assert_eq!(settings.max_lifetime, Duration::from_secs(300));
    }
}
