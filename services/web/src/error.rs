//! services/web/src/error.rs
//!
//! Defines the primary error type for the web service.

use crate::config::ConfigError;

/// The primary error type for the `web` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying the embedded SQL migrations failed.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn startup_failures_convert_into_api_error() {
        fn load() -> Result<Config, ApiError> {
            Ok(Config::from_lookup(|_: &str| None)?)
        }
        let err = load().unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: Missing the environment variable DATABASE_URL");
    }
}
