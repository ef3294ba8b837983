use async_trait::async_trait;
use dispatch_core::{LegacyAccessToken, LegacyRefreshToken, OAuth2Error};
use dispatch_ports::{TokenCounts, TokenSchema, TokenStore};

use crate::pool::DatabasePool;

const SQLITE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS legacy_access_tokens (
        id TEXT PRIMARY KEY,
        token TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        client_id TEXT NOT NULL,
        scope INTEGER NOT NULL,
        expires_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS legacy_refresh_tokens (
        id TEXT PRIMARY KEY,
        token TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        client_id TEXT NOT NULL,
        access_token_id TEXT NOT NULL,
        expired INTEGER NOT NULL DEFAULT 0
    );
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_legacy_access_tokens_user_id ON legacy_access_tokens(user_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_legacy_refresh_tokens_user_id ON legacy_refresh_tokens(user_id);"#,
];

const POSTGRES_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS legacy_access_tokens (
        id TEXT PRIMARY KEY,
        token TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        client_id TEXT NOT NULL,
        scope BIGINT NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS legacy_refresh_tokens (
        id TEXT PRIMARY KEY,
        token TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        client_id TEXT NOT NULL,
        access_token_id TEXT NOT NULL,
        expired BOOLEAN NOT NULL DEFAULT FALSE
    );
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_legacy_access_tokens_user_id ON legacy_access_tokens(user_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_legacy_refresh_tokens_user_id ON legacy_refresh_tokens(user_id);"#,
];

/// Legacy-schema token store.
///
/// Only revocation reaches these tables through the `TokenStore` port; the
/// inherent save/get methods exist for data carried over from the old
/// provider and for tests.
pub struct LegacySqlxStore {
    pool: DatabasePool,
}

impl LegacySqlxStore {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Ok(Self {
            pool: DatabasePool::connect(database_url).await?,
        })
    }

    pub async fn save_access_token(&self, token: &LegacyAccessToken) -> Result<(), OAuth2Error> {
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO legacy_access_tokens (id, token, user_id, client_id, scope, expires_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&token.id)
                .bind(&token.token)
                .bind(&token.user_id)
                .bind(&token.client_id)
                .bind(token.scope)
                .bind(token.expires_at)
                .execute(pool)
                .await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO legacy_access_tokens (id, token, user_id, client_id, scope, expires_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(&token.id)
                .bind(&token.token)
                .bind(&token.user_id)
                .bind(&token.client_id)
                .bind(token.scope)
                .bind(token.expires_at)
                .execute(pool)
                .await?;
            }
        }

        Ok(())
    }

    pub async fn save_refresh_token(&self, token: &LegacyRefreshToken) -> Result<(), OAuth2Error> {
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO legacy_refresh_tokens (id, token, user_id, client_id, access_token_id, expired)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&token.id)
                .bind(&token.token)
                .bind(&token.user_id)
                .bind(&token.client_id)
                .bind(&token.access_token_id)
                .bind(token.expired)
                .execute(pool)
                .await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO legacy_refresh_tokens (id, token, user_id, client_id, access_token_id, expired)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(&token.id)
                .bind(&token.token)
                .bind(&token.user_id)
                .bind(&token.client_id)
                .bind(&token.access_token_id)
                .bind(token.expired)
                .execute(pool)
                .await?;
            }
        }

        Ok(())
    }

    pub async fn get_access_token(
        &self,
        token: &str,
    ) -> Result<Option<LegacyAccessToken>, OAuth2Error> {
        let access_token = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as::<_, LegacyAccessToken>(
                    "SELECT * FROM legacy_access_tokens WHERE token = ?",
                )
                .bind(token)
                .fetch_optional(pool)
                .await?
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query_as::<_, LegacyAccessToken>(
                    "SELECT * FROM legacy_access_tokens WHERE token = $1",
                )
                .bind(token)
                .fetch_optional(pool)
                .await?
            }
        };

        Ok(access_token)
    }
}

#[async_trait]
impl TokenStore for LegacySqlxStore {
    fn schema(&self) -> TokenSchema {
        TokenSchema::Legacy
    }

    async fn init(&self) -> Result<(), OAuth2Error> {
        self.pool.bootstrap(SQLITE_SCHEMA, POSTGRES_SCHEMA).await?;
        self.pool.ping().await?;
        Ok(())
    }

    async fn healthcheck(&self) -> Result<(), OAuth2Error> {
        self.pool.ping().await.map_err(Into::into)
    }

    async fn delete_user_tokens(&self, user_id: &str) -> Result<TokenCounts, OAuth2Error> {
        let (access_tokens, refresh_tokens) = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                let access = sqlx::query("DELETE FROM legacy_access_tokens WHERE user_id = ?")
                    .bind(user_id)
                    .execute(pool)
                    .await?;
                let refresh = sqlx::query("DELETE FROM legacy_refresh_tokens WHERE user_id = ?")
                    .bind(user_id)
                    .execute(pool)
                    .await?;
                (access.rows_affected(), refresh.rows_affected())
            }
            DatabasePool::Postgres(pool) => {
                let access = sqlx::query("DELETE FROM legacy_access_tokens WHERE user_id = $1")
                    .bind(user_id)
                    .execute(pool)
                    .await?;
                let refresh =
                    sqlx::query("DELETE FROM legacy_refresh_tokens WHERE user_id = $1")
                        .bind(user_id)
                        .execute(pool)
                        .await?;
                (access.rows_affected(), refresh.rows_affected())
            }
        };

        Ok(TokenCounts {
            access_tokens,
            refresh_tokens,
        })
    }

    async fn count_user_tokens(&self, user_id: &str) -> Result<TokenCounts, OAuth2Error> {
        let (access_tokens, refresh_tokens) = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                let access: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM legacy_access_tokens WHERE user_id = ?",
                )
                .bind(user_id)
                .fetch_one(pool)
                .await?;
                let refresh: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM legacy_refresh_tokens WHERE user_id = ?",
                )
                .bind(user_id)
                .fetch_one(pool)
                .await?;
                (access, refresh)
            }
            DatabasePool::Postgres(pool) => {
                let access: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM legacy_access_tokens WHERE user_id = $1",
                )
                .bind(user_id)
                .fetch_one(pool)
                .await?;
                let refresh: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM legacy_refresh_tokens WHERE user_id = $1",
                )
                .bind(user_id)
                .fetch_one(pool)
                .await?;
                (access, refresh)
            }
        };

        Ok(TokenCounts {
            access_tokens: access_tokens as u64,
            refresh_tokens: refresh_tokens as u64,
        })
    }
}
