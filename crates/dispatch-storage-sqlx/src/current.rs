use async_trait::async_trait;
use chrono::Utc;
use dispatch_core::{AccessToken, Client, OAuth2Error, RefreshToken};
use dispatch_ports::{Storage, TokenCounts, TokenSchema, TokenStore};
use sqlx::{PgConnection, SqliteConnection};

use crate::pool::DatabasePool;

const SQLITE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS clients (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL UNIQUE,
        client_secret TEXT NOT NULL,
        client_type TEXT NOT NULL,
        authorization_grant_type TEXT NOT NULL,
        redirect_uris TEXT NOT NULL,
        name TEXT NOT NULL,
        user_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS access_tokens (
        id TEXT PRIMARY KEY,
        token TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        client_id TEXT NOT NULL,
        scope TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL,
        source_refresh_token_id TEXT,
        FOREIGN KEY (client_id) REFERENCES clients(client_id)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id TEXT PRIMARY KEY,
        token TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        client_id TEXT NOT NULL,
        scope TEXT NOT NULL,
        access_token_id TEXT,
        created_at TEXT NOT NULL,
        revoked_at TEXT,
        FOREIGN KEY (client_id) REFERENCES clients(client_id)
    );
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_access_tokens_user_id ON access_tokens(user_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user_id ON refresh_tokens(user_id);"#,
];

const POSTGRES_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS clients (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL UNIQUE,
        client_secret TEXT NOT NULL,
        client_type TEXT NOT NULL,
        authorization_grant_type TEXT NOT NULL,
        redirect_uris TEXT NOT NULL,
        name TEXT NOT NULL,
        user_id TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS access_tokens (
        id TEXT PRIMARY KEY,
        token TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        client_id TEXT NOT NULL REFERENCES clients(client_id),
        scope TEXT NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        source_refresh_token_id TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id TEXT PRIMARY KEY,
        token TEXT NOT NULL UNIQUE,
        user_id TEXT NOT NULL,
        client_id TEXT NOT NULL REFERENCES clients(client_id),
        scope TEXT NOT NULL,
        access_token_id TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        revoked_at TIMESTAMPTZ
    );
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_access_tokens_user_id ON access_tokens(user_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user_id ON refresh_tokens(user_id);"#,
];

/// Current-schema storage (SQLite/Postgres) using SQLx.
pub struct SqlxStorage {
    pool: DatabasePool,
}

impl SqlxStorage {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Ok(Self {
            pool: DatabasePool::connect(database_url).await?,
        })
    }
}

#[async_trait]
impl TokenStore for SqlxStorage {
    fn schema(&self) -> TokenSchema {
        TokenSchema::Current
    }

    async fn init(&self) -> Result<(), OAuth2Error> {
        self.pool.bootstrap(SQLITE_SCHEMA, POSTGRES_SCHEMA).await?;
        self.pool.ping().await?;
        Ok(())
    }

    async fn healthcheck(&self) -> Result<(), OAuth2Error> {
        // Keep readiness/liveness cheap: don't re-run the bootstrap.
        self.pool.ping().await.map_err(Into::into)
    }

    async fn delete_user_tokens(&self, user_id: &str) -> Result<TokenCounts, OAuth2Error> {
        let (refresh_tokens, access_tokens) = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                let refresh = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
                    .bind(user_id)
                    .execute(pool)
                    .await?;
                let access = sqlx::query("DELETE FROM access_tokens WHERE user_id = ?")
                    .bind(user_id)
                    .execute(pool)
                    .await?;
                (refresh.rows_affected(), access.rows_affected())
            }
            DatabasePool::Postgres(pool) => {
                let refresh = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
                    .bind(user_id)
                    .execute(pool)
                    .await?;
                let access = sqlx::query("DELETE FROM access_tokens WHERE user_id = $1")
                    .bind(user_id)
                    .execute(pool)
                    .await?;
                (refresh.rows_affected(), access.rows_affected())
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
                let access: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM access_tokens WHERE user_id = ?")
                        .bind(user_id)
                        .fetch_one(pool)
                        .await?;
                let refresh: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
                        .bind(user_id)
                        .fetch_one(pool)
                        .await?;
                (access, refresh)
            }
            DatabasePool::Postgres(pool) => {
                let access: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM access_tokens WHERE user_id = $1")
                        .bind(user_id)
                        .fetch_one(pool)
                        .await?;
                let refresh: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1")
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

#[async_trait]
impl Storage for SqlxStorage {
    async fn save_client(&self, client: &Client) -> Result<(), OAuth2Error> {
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO clients (id, client_id, client_secret, client_type, authorization_grant_type, redirect_uris, name, user_id, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&client.id)
                .bind(&client.client_id)
                .bind(&client.client_secret)
                .bind(&client.client_type)
                .bind(&client.authorization_grant_type)
                .bind(&client.redirect_uris)
                .bind(&client.name)
                .bind(&client.user_id)
                .bind(client.created_at)
                .bind(client.updated_at)
                .execute(pool)
                .await?;
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query(
                    r#"
                    INSERT INTO clients (id, client_id, client_secret, client_type, authorization_grant_type, redirect_uris, name, user_id, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    "#,
                )
                .bind(&client.id)
                .bind(&client.client_id)
                .bind(&client.client_secret)
                .bind(&client.client_type)
                .bind(&client.authorization_grant_type)
                .bind(&client.redirect_uris)
                .bind(&client.name)
                .bind(&client.user_id)
                .bind(client.created_at)
                .bind(client.updated_at)
                .execute(pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<Client>, OAuth2Error> {
        let client = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE client_id = ?")
                    .bind(client_id)
                    .fetch_optional(pool)
                    .await?
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE client_id = $1")
                    .bind(client_id)
                    .fetch_optional(pool)
                    .await?
            }
        };

        Ok(client)
    }

    async fn save_bearer_token(
        &self,
        access_token: &AccessToken,
        refresh_token: Option<&RefreshToken>,
    ) -> Result<(), OAuth2Error> {
        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                let mut tx = pool.begin().await?;
                insert_access_token_sqlite(&mut tx, access_token).await?;
                if let Some(refresh_token) = refresh_token {
                    insert_refresh_token_sqlite(&mut tx, refresh_token).await?;
                }
                tx.commit().await?;
            }
            DatabasePool::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                insert_access_token_postgres(&mut tx, access_token).await?;
                if let Some(refresh_token) = refresh_token {
                    insert_refresh_token_postgres(&mut tx, refresh_token).await?;
                }
                tx.commit().await?;
            }
        }

        Ok(())
    }

    async fn get_access_token(&self, token: &str) -> Result<Option<AccessToken>, OAuth2Error> {
        let access_token = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as::<_, AccessToken>("SELECT * FROM access_tokens WHERE token = ?")
                    .bind(token)
                    .fetch_optional(pool)
                    .await?
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query_as::<_, AccessToken>("SELECT * FROM access_tokens WHERE token = $1")
                    .bind(token)
                    .fetch_optional(pool)
                    .await?
            }
        };

        Ok(access_token)
    }

    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, OAuth2Error> {
        let refresh_token = match &self.pool {
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token = ?")
                    .bind(token)
                    .fetch_optional(pool)
                    .await?
            }
            DatabasePool::Postgres(pool) => {
                sqlx::query_as::<_, RefreshToken>(
                    "SELECT * FROM refresh_tokens WHERE token = $1",
                )
                .bind(token)
                .fetch_optional(pool)
                .await?
            }
        };

        Ok(refresh_token)
    }

    async fn rotate_refresh_token(
        &self,
        consumed: &RefreshToken,
        access_token: &AccessToken,
        refresh_token: &RefreshToken,
    ) -> Result<(), OAuth2Error> {
        let now = Utc::now();

        match &self.pool {
            DatabasePool::Sqlite(pool) => {
                let mut tx = pool.begin().await?;
                let revoked = sqlx::query(
                    "UPDATE refresh_tokens SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL",
                )
                .bind(now)
                .bind(&consumed.id)
                .execute(&mut *tx)
                .await?;

                if revoked.rows_affected() != 1 {
                    tx.rollback().await?;
                    return Err(OAuth2Error::invalid_grant(
                        "Refresh token has already been used",
                    ));
                }

                if let Some(access_token_id) = &consumed.access_token_id {
                    sqlx::query("DELETE FROM access_tokens WHERE id = ?")
                        .bind(access_token_id)
                        .execute(&mut *tx)
                        .await?;
                }

                insert_access_token_sqlite(&mut tx, access_token).await?;
                insert_refresh_token_sqlite(&mut tx, refresh_token).await?;
                tx.commit().await?;
            }
            DatabasePool::Postgres(pool) => {
                let mut tx = pool.begin().await?;
                let revoked = sqlx::query(
                    "UPDATE refresh_tokens SET revoked_at = $1 WHERE id = $2 AND revoked_at IS NULL",
                )
                .bind(now)
                .bind(&consumed.id)
                .execute(&mut *tx)
                .await?;

                if revoked.rows_affected() != 1 {
                    tx.rollback().await?;
                    return Err(OAuth2Error::invalid_grant(
                        "Refresh token has already been used",
                    ));
                }

                if let Some(access_token_id) = &consumed.access_token_id {
                    sqlx::query("DELETE FROM access_tokens WHERE id = $1")
                        .bind(access_token_id)
                        .execute(&mut *tx)
                        .await?;
                }

                insert_access_token_postgres(&mut tx, access_token).await?;
                insert_refresh_token_postgres(&mut tx, refresh_token).await?;
                tx.commit().await?;
            }
        }

        Ok(())
    }
}

async fn insert_access_token_sqlite(
    conn: &mut SqliteConnection,
    token: &AccessToken,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO access_tokens (id, token, user_id, client_id, scope, expires_at, created_at, source_refresh_token_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&token.id)
    .bind(&token.token)
    .bind(&token.user_id)
    .bind(&token.client_id)
    .bind(&token.scope)
    .bind(token.expires_at)
    .bind(token.created_at)
    .bind(&token.source_refresh_token_id)
    .execute(conn)
    .await?;

    Ok(())
}

async fn insert_refresh_token_sqlite(
    conn: &mut SqliteConnection,
    token: &RefreshToken,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, token, user_id, client_id, scope, access_token_id, created_at, revoked_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&token.id)
    .bind(&token.token)
    .bind(&token.user_id)
    .bind(&token.client_id)
    .bind(&token.scope)
    .bind(&token.access_token_id)
    .bind(token.created_at)
    .bind(token.revoked_at)
    .execute(conn)
    .await?;

    Ok(())
}

async fn insert_access_token_postgres(
    conn: &mut PgConnection,
    token: &AccessToken,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO access_tokens (id, token, user_id, client_id, scope, expires_at, created_at, source_refresh_token_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&token.id)
    .bind(&token.token)
    .bind(&token.user_id)
    .bind(&token.client_id)
    .bind(&token.scope)
    .bind(token.expires_at)
    .bind(token.created_at)
    .bind(&token.source_refresh_token_id)
    .execute(conn)
    .await?;

    Ok(())
}

async fn insert_refresh_token_postgres(
    conn: &mut PgConnection,
    token: &RefreshToken,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, token, user_id, client_id, scope, access_token_id, created_at, revoked_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&token.id)
    .bind(&token.token)
    .bind(&token.user_id)
    .bind(&token.client_id)
    .bind(&token.scope)
    .bind(&token.access_token_id)
    .bind(token.created_at)
    .bind(token.revoked_at)
    .execute(conn)
    .await?;

    Ok(())
}
