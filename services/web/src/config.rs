//! services/web/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where books and accounts are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { database_url: String },
    /// Everything lives in process memory and is lost on restart.
    Memory,
}

/// OAuth2 settings for the federated sign-in provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FederatedSettings {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_url: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store: StoreBackend,
    pub log_level: Level,
    pub session_ttl_days: i64,
    pub reset_token_ttl_minutes: i64,
    pub cookie_secure: bool,
    pub allowed_origin: String,
    pub public_base_url: String,
    pub federated: Option<FederatedSettings>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // --- Server settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Store ---
        let backend = var("STORE_BACKEND").unwrap_or_else(|| "postgres".to_string());
        let store = match backend.to_lowercase().as_str() {
            "postgres" => StoreBackend::Postgres {
                database_url: var("DATABASE_URL")
                    .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?,
            },
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORE_BACKEND".to_string(),
                    format!("'{}' is not one of postgres, memory", other),
                ))
            }
        };

        // --- Sessions and cookies ---
        let session_ttl_days = parse_number(&var, "SESSION_TTL_DAYS", 30)?;
        let reset_token_ttl_minutes = parse_number(&var, "RESET_TOKEN_TTL_MINUTES", 60)?;
        let cookie_secure = match var("COOKIE_SECURE") {
            None => true,
            Some(v) => v.parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue("COOKIE_SECURE".to_string(), format!("'{}' is not true or false", v))
            })?,
        };
        let allowed_origin =
            var("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());
        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        // --- Federated sign-in (all or nothing once a client id is set) ---
        let federated = match var("FEDERATED_CLIENT_ID") {
            None => None,
            Some(client_id) => {
                let required = |key: &str| {
                    var(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()))
                };
                Some(FederatedSettings {
                    client_id,
                    client_secret: required("FEDERATED_CLIENT_SECRET")?,
                    authorize_url: required("FEDERATED_AUTHORIZE_URL")?,
                    token_url: required("FEDERATED_TOKEN_URL")?,
                    userinfo_url: required("FEDERATED_USERINFO_URL")?,
                    redirect_url: required("FEDERATED_REDIRECT_URL")?,
                })
            }
        };

        Ok(Self {
            bind_address,
            store,
            log_level,
            session_ttl_days,
            reset_token_ttl_minutes,
            cookie_secure,
            allowed_origin,
            public_base_url,
            federated,
        })
    }
}

fn parse_number(var: &impl Fn(&str) -> Option<String>, key: &str, default: i64) -> Result<i64, ConfigError> {
    match var(key) {
        None => Ok(default),
        Some(v) => v
            .parse::<i64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::InvalidValue(key.to_string(), format!("'{}' is not a positive number", v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_with_a_database_url() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/readmate")])).unwrap();

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(
            config.store,
            StoreBackend::Postgres { database_url: "postgres://localhost/readmate".into() }
        );
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.session_ttl_days, 30);
        assert!(config.cookie_secure);
        assert!(config.federated.is_none());
    }

    #[test]
    fn postgres_backend_requires_database_url() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(v) if v == "DATABASE_URL"));
    }

    #[test]
    fn memory_backend_needs_no_database() {
        let config = Config::from_lookup(lookup(&[("STORE_BACKEND", "memory"), ("COOKIE_SECURE", "false")])).unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
        assert!(!config.cookie_secure);
    }

    #[test]
    fn partial_federated_settings_are_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("FEDERATED_CLIENT_ID", "readmate"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(v) if v == "FEDERATED_CLIENT_SECRET"));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = Config::from_lookup(lookup(&[("STORE_BACKEND", "memory"), ("SESSION_TTL_DAYS", "-2")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(v, _) if v == "SESSION_TTL_DAYS"));
    }
}
