use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// `start + seconds`, clamped to the representable range.
pub(crate) fn expiry_after(start: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    Duration::try_seconds(seconds)
        .and_then(|lifetime| start.checked_add_signed(lifetime))
        .unwrap_or(if seconds < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Access token row in the current schema.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub client_id: String,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Refresh token this access token was minted from, if any.
    pub source_refresh_token_id: Option<String>,
}

impl AccessToken {
    pub fn new(
        token: String,
        user_id: String,
        client_id: String,
        scope: String,
        expires_in: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            token,
            user_id,
            client_id,
            scope,
            expires_at: expiry_after(now, expires_in),
            created_at: now,
            source_refresh_token_id: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Refresh token row in the current schema.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub client_id: String,
    pub scope: String,
    pub access_token_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// A refresh token paired with (and scoped like) `access_token`.
    pub fn for_access_token(token: String, access_token: &AccessToken) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            token,
            user_id: access_token.user_id.clone(),
            client_id: access_token.client_id.clone(),
            scope: access_token.scope.clone(),
            access_token_id: Some(access_token.id.clone()),
            created_at: Utc::now(),
            revoked_at: None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// `lifetime` of `None` means refresh tokens never expire.
    pub fn is_expired(&self, lifetime: Option<i64>) -> bool {
        match lifetime {
            Some(seconds) => Utc::now() >= expiry_after(self.created_at, seconds),
            None => false,
        }
    }
}

/// The token record handed back to callers; its JSON shape is a fixed contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String, refresh_token: String, expires_in: i64, scope: String) -> Self {
        Self {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in,
            refresh_token,
            scope,
        }
    }
}
