//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SERVICE_BAY_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `SERVICE_BAY_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `SERVICE_BAY_CURRENCY` - Currency for newly received stock (default: USD)

use secrecy::SecretString;
use thiserror::Error;

use service_bay_core::CurrencyCode;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin application configuration.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Maximum connections in the pool
    pub max_connections: u32,
    /// Currency assigned to stock received without an explicit one
    pub default_currency: CurrencyCode,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("default_currency", &self.default_currency)
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("SERVICE_BAY_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("SERVICE_BAY_DATABASE_URL".to_string()))?;

        let max_connections = match lookup("SERVICE_BAY_DB_MAX_CONNECTIONS") {
            Some(raw) => parse_max_connections(&raw)?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let default_currency = lookup("SERVICE_BAY_CURRENCY")
            .map(|raw| {
                raw.parse::<CurrencyCode>().map_err(|e| {
                    ConfigError::InvalidEnvVar("SERVICE_BAY_CURRENCY".to_string(), e.to_string())
                })
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            database_url,
            max_connections,
            default_currency,
        })
    }
}

fn parse_max_connections(raw: &str) -> Result<u32, ConfigError> {
    let invalid =
        |msg: String| ConfigError::InvalidEnvVar("SERVICE_BAY_DB_MAX_CONNECTIONS".to_string(), msg);

    let value = raw.trim().parse::<u32>().map_err(|e| invalid(e.to_string()))?;
    if value == 0 {
        return Err(invalid("must be at least 1".to_string()));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            AdminConfig::from_lookup(lookup_from(&[("SERVICE_BAY_DATABASE_URL", "postgres://db")]))
                .unwrap();

        assert_eq!(config.database_url.expose_secret(), "postgres://db");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.default_currency, CurrencyCode::USD);
    }

    #[test]
    fn test_database_url_fallback() {
        let config =
            AdminConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://fallback")]))
                .unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fallback");
    }

    #[test]
    fn test_missing_database_url() {
        let err = AdminConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "SERVICE_BAY_DATABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = AdminConfig::from_lookup(lookup_from(&[
            ("SERVICE_BAY_DATABASE_URL", "postgres://db"),
            ("SERVICE_BAY_DB_MAX_CONNECTIONS", "4"),
            ("SERVICE_BAY_CURRENCY", "lkr"),
        ]))
        .unwrap();

        assert_eq!(config.max_connections, 4);
        assert_eq!(config.default_currency, CurrencyCode::LKR);
    }

    #[test]
    fn test_invalid_values() {
        let zero = AdminConfig::from_lookup(lookup_from(&[
            ("SERVICE_BAY_DATABASE_URL", "postgres://db"),
            ("SERVICE_BAY_DB_MAX_CONNECTIONS", "0"),
        ]));
        assert!(matches!(zero, Err(ConfigError::InvalidEnvVar(_, _))));

        let currency = AdminConfig::from_lookup(lookup_from(&[
            ("SERVICE_BAY_DATABASE_URL", "postgres://db"),
            ("SERVICE_BAY_CURRENCY", "doubloons"),
        ]));
        assert!(matches!(currency, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = AdminConfig::from_lookup(lookup_from(&[(
            "SERVICE_BAY_DATABASE_URL",
            "postgres://user:hunter2@db",
        )]))
        .unwrap();

        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
