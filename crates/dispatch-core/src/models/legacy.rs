use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access token row in the legacy schema.
///
/// Legacy rows are never minted by the dispatch facades; they are only
/// removed by user-wide revocation.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LegacyAccessToken {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub client_id: String,
    /// Scope bitmask (see `Scope::key`).
    pub scope: i64,
    pub expires_at: DateTime<Utc>,
}

impl LegacyAccessToken {
    pub fn new(token: String, user_id: String, client_id: String, scope: i64, expires_in: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            token,
            user_id,
            client_id,
            scope,
            expires_at: super::token::expiry_after(Utc::now(), expires_in),
        }
    }
}

/// Refresh token row in the legacy schema.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LegacyRefreshToken {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub client_id: String,
    pub access_token_id: String,
    pub expired: bool,
}

impl LegacyRefreshToken {
    pub fn new(token: String, access_token: &LegacyAccessToken) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            token,
            user_id: access_token.user_id.clone(),
            client_id: access_token.client_id.clone(),
            access_token_id: access_token.id.clone(),
            expired: false,
        }
    }
}
