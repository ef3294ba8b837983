use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use dispatch_core::{AccessToken, Client, OAuth2Error, RefreshToken};

/// Which token record layout a store persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSchema {
    Legacy,
    Current,
}

impl TokenSchema {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenSchema::Legacy => "legacy",
            TokenSchema::Current => "current",
        }
    }
}

impl fmt::Display for TokenSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row counts for one user in one store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub access_tokens: u64,
    pub refresh_tokens: u64,
}

impl TokenCounts {
    pub fn total(&self) -> u64 {
        self.access_tokens + self.refresh_tokens
    }
}

/// The part of a token backend every schema shares: user-wide bookkeeping.
///
/// Revocation enumerates all registered stores through this trait.
#[async_trait]
pub trait TokenStore: Send + Sync {
    fn schema(&self) -> TokenSchema;

    /// Initialize the backing store (e.g., bootstrap schema / create indexes).
    async fn init(&self) -> Result<(), OAuth2Error>;

    /// Delete every access and refresh token owned by `user_id`.
    ///
    /// Returns what was deleted; deleting nothing is not an error.
    async fn delete_user_tokens(&self, user_id: &str) -> Result<TokenCounts, OAuth2Error>;

    async fn count_user_tokens(&self, user_id: &str) -> Result<TokenCounts, OAuth2Error>;

    /// Lightweight liveness/readiness check.
    ///
    /// Implementations may override to do something cheaper than `init()`.
    async fn healthcheck(&self) -> Result<(), OAuth2Error> {
        self.init().await
    }
}

pub type DynTokenStore = Arc<dyn TokenStore>;

/// Current-schema backend: clients plus everything issuance and refresh need.
#[async_trait]
pub trait Storage: TokenStore {
    // Client operations
    async fn save_client(&self, client: &Client) -> Result<(), OAuth2Error>;
    async fn get_client(&self, client_id: &str) -> Result<Option<Client>, OAuth2Error>;

    // Token operations
    async fn save_bearer_token(
        &self,
        access_token: &AccessToken,
        refresh_token: Option<&RefreshToken>,
    ) -> Result<(), OAuth2Error>;

    async fn get_access_token(&self, token: &str) -> Result<Option<AccessToken>, OAuth2Error>;
    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, OAuth2Error>;

    /// Atomically revoke `consumed`, delete its access token, and persist the
    /// replacement pair.
    ///
    /// Fails with `invalid_grant` when `consumed` was already revoked, so only
    /// one of two concurrent redemptions wins.
    async fn rotate_refresh_token(
        &self,
        consumed: &RefreshToken,
        access_token: &AccessToken,
        refresh_token: &RefreshToken,
    ) -> Result<(), OAuth2Error>;
}

pub type DynStorage = Arc<dyn Storage>;
