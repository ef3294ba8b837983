//! Token store selection for oauth-dispatch.
//!
//! Centralizes URL-based backend selection and wraps each store with its
//! observed decorator, so callers only ever see traced stores.

use std::sync::Arc;

use dispatch_config::DatabaseConfig;
use dispatch_core::OAuth2Error;

pub use dispatch_observability::{ObservedStorage, ObservedTokenStore};
pub use dispatch_ports::{DynStorage, DynTokenStore, Storage, TokenStore};

pub mod sqlx {
    pub use dispatch_storage_sqlx::{LegacySqlxStore, SqlxStorage};
}

/// Everything the dispatch facades persist through.
#[derive(Clone)]
pub struct TokenBackends {
    /// Current schema: clients, issuance, refresh rotation.
    pub storage: DynStorage,
    /// Every schema a user's tokens may live in; revocation walks all of them.
    pub stores: Vec<DynTokenStore>,
}

impl TokenBackends {
    /// Bootstrap every store's schema.
    pub async fn init(&self) -> Result<(), OAuth2Error> {
        for store in &self.stores {
            store.init().await?;
        }
        Ok(())
    }
}

/// Open and wire both token schemas described by `config`.
pub async fn create_backends(config: &DatabaseConfig) -> Result<TokenBackends, OAuth2Error> {
    let current = create_storage(&config.url).await?;
    let legacy = create_legacy_store(config.legacy_url()).await?;

    let storage: DynStorage = current.clone();
    let legacy: DynTokenStore = legacy;
    let current: DynTokenStore = current;
    let stores = vec![legacy, current];

    Ok(TokenBackends { storage, stores })
}

/// Create the current-schema backend based on URL scheme.
///
/// Supported: `postgres://…`, `postgresql://…` and `sqlite:…`.
pub async fn create_storage(database_url: &str) -> Result<Arc<ObservedStorage>, OAuth2Error> {
    let db_system = db_system(database_url)?;
    let storage = dispatch_storage_sqlx::SqlxStorage::new(database_url).await?;
    let inner: DynStorage = Arc::new(storage);
    Ok(Arc::new(ObservedStorage::new(inner, db_system.to_string())))
}

/// Create the legacy-schema store based on URL scheme.
pub async fn create_legacy_store(
    database_url: &str,
) -> Result<Arc<ObservedTokenStore>, OAuth2Error> {
    let db_system = db_system(database_url)?;
    let store = dispatch_storage_sqlx::LegacySqlxStore::new(database_url).await?;
    let inner: DynTokenStore = Arc::new(store);
    Ok(Arc::new(ObservedTokenStore::new(inner, db_system.to_string())))
}

fn db_system(database_url: &str) -> Result<&'static str, OAuth2Error> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgresql")
    } else if database_url.starts_with("sqlite:") {
        Ok("sqlite")
    } else {
        Err(OAuth2Error::server_error(
            "Unsupported database URL scheme (expected sqlite: or postgres://)",
        ))
    }
}
