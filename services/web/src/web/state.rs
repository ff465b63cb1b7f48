//! services/web/src/web/state.rs
//!
//! Defines the application's shared state and how it is wired from the
//! configuration.

use crate::adapters::{
    CredentialStore, DbAdapter, LocalIdentityProvider, LogResetNotifier, MemoryStore, OAuthClient,
};
use crate::config::{Config, StoreBackend};
use crate::error::ApiError;
use crate::web::device::DeviceRegistry;
use chrono::Duration;
use readmate_core::ports::{BookRepository, IdentityProvider};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub books: Arc<dyn BookRepository>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<Config>,
    pub devices: DeviceRegistry,
}

impl AppState {
    pub fn new(books: Arc<dyn BookRepository>, identity: Arc<dyn IdentityProvider>, config: Config) -> Self {
        Self {
            devices: DeviceRegistry::new(books.clone(), identity.clone()),
            books,
            identity,
            config: Arc::new(config),
        }
    }

    /// Everything in process memory. Used for `STORE_BACKEND=memory` and tests.
    pub fn in_memory(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let identity = Arc::new(local_identity(store.clone(), &config));
        Self::new(store, identity, config)
    }

    /// Connects the configured store (running migrations for Postgres) and
    /// builds the identity provider on top of it.
    pub async fn from_config(config: Config) -> Result<Self, ApiError> {
        match &config.store {
            StoreBackend::Postgres { database_url } => {
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new().max_connections(5).connect(database_url).await?;
                let db_adapter = Arc::new(DbAdapter::new(db_pool));
                info!("Running database migrations...");
                db_adapter.run_migrations().await?;
                info!("Database migrations complete.");

                let identity = Arc::new(local_identity(db_adapter.clone(), &config));
                Ok(Self::new(db_adapter, identity, config))
            }
            StoreBackend::Memory => {
                info!("Using the in-memory store; data will not survive a restart.");
                Ok(Self::in_memory(config))
            }
        }
    }
}

fn local_identity(store: Arc<dyn CredentialStore>, config: &Config) -> LocalIdentityProvider {
    let identity = LocalIdentityProvider::new(
        store,
        Arc::new(LogResetNotifier),
        Duration::days(config.session_ttl_days),
        Duration::minutes(config.reset_token_ttl_minutes),
        config.public_base_url.clone(),
    );
    match &config.federated {
        Some(settings) => {
            info!("Federated sign-in enabled");
            identity.with_federated(Arc::new(OAuthClient::new(settings.clone())))
        }
        None => identity,
    }
}
