pub use dispatch_storage_factory::{
    create_backends, create_legacy_store, create_storage, DynStorage, DynTokenStore,
    ObservedStorage, ObservedTokenStore, Storage, TokenBackends, TokenStore,
};
pub use dispatch_ports::{TokenCounts, TokenSchema};

/// Module path for the SQLx adapters.
pub use dispatch_storage_factory::sqlx;

