#![allow(dead_code)]

use oauth_dispatch::config::{Config, DatabaseConfig, JwtConfig, OAuthConfig};
use oauth_dispatch::models::{
    AccessToken, Client, GrantType, LegacyAccessToken, LegacyRefreshToken, RefreshToken, User,
    CLIENT_TYPE_CONFIDENTIAL,
};
use oauth_dispatch::storage::sqlx::LegacySqlxStore;
use oauth_dispatch::storage::{DynStorage, Storage};
use oauth_dispatch::OAuthDispatch;

pub const REDIRECT_URI: &str = "https://example.com/callback";

/// Dispatch wired to temporary SQLite files (not `:memory:`, so the pools can
/// use multiple connections safely). Both schemas get their own file.
pub struct TestContext {
    pub dir: tempfile::TempDir,
    pub config: Config,
    pub dispatch: OAuthDispatch,
    pub storage: DynStorage,
    /// Direct handle on the legacy tables, for seeding.
    pub legacy: LegacySqlxStore,
}

pub async fn setup() -> TestContext {
    setup_with(OAuthConfig::default()).await
}

pub async fn setup_with(oauth: OAuthConfig) -> TestContext {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config {
        database: DatabaseConfig {
            url: sqlite_url(&dir, "current.db"),
            legacy_url: Some(sqlite_url(&dir, "legacy.db")),
        },
        oauth,
        jwt: JwtConfig::default(),
    };

    let backends = oauth_dispatch::storage::create_backends(&config.database)
        .await
        .expect("backends");
    backends.init().await.expect("schema bootstrap");
    let storage = backends.storage.clone();
    let dispatch = OAuthDispatch::new(backends, config.oauth.clone());

    let legacy = LegacySqlxStore::new(config.database.legacy_url())
        .await
        .expect("legacy store");

    TestContext {
        dir,
        config,
        dispatch,
        storage,
        legacy,
    }
}

pub fn sqlite_url(dir: &tempfile::TempDir, file: &str) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join(file).display())
}

pub fn user(username: &str) -> User {
    User::new(username.to_string(), format!("{}@example.com", username))
}

pub async fn public_client(ctx: &TestContext, owner: &User, client_id: &str) -> Client {
    ctx.dispatch
        .create_public_client("Test App", owner, REDIRECT_URI, Some(client_id))
        .await
        .expect("public client")
}

pub async fn client_with(
    ctx: &TestContext,
    client_id: &str,
    secret: &str,
    client_type: &str,
    grant_type: GrantType,
) -> Client {
    let client = Client::new(
        client_id.to_string(),
        secret.to_string(),
        client_type,
        grant_type,
        vec![REDIRECT_URI.to_string()],
        format!("{} app", client_id),
        None,
    );
    ctx.storage.save_client(&client).await.expect("save client");
    client
}

pub async fn confidential_client(ctx: &TestContext, client_id: &str, secret: &str) -> Client {
    client_with(
        ctx,
        client_id,
        secret,
        CLIENT_TYPE_CONFIDENTIAL,
        GrantType::Password,
    )
    .await
}

/// One access/refresh pair in the legacy tables for `owner`.
pub async fn seed_legacy_tokens(ctx: &TestContext, owner: &User, client_id: &str) {
    let access = LegacyAccessToken::new(
        format!("legacy-at-{}", owner.id),
        owner.id.clone(),
        client_id.to_string(),
        0,
        3600,
    );
    ctx.legacy
        .save_access_token(&access)
        .await
        .expect("legacy access token");
    ctx.legacy
        .save_refresh_token(&LegacyRefreshToken::new(
            format!("legacy-rt-{}", owner.id),
            &access,
        ))
        .await
        .expect("legacy refresh token");
}

/// A minimal contract suite every current-schema `Storage` backend must satisfy.
pub async fn run_storage_contract(storage: &dyn Storage) -> Result<(), Box<dyn std::error::Error>> {
    // Client roundtrip
    let client = Client::public(
        "contract-client".to_string(),
        "Contract".to_string(),
        "owner".to_string(),
        REDIRECT_URI.to_string(),
    );
    storage.save_client(&client).await?;

    let fetched = storage
        .get_client("contract-client")
        .await?
        .ok_or_else(|| std::io::Error::other("client should exist"))?;
    assert_eq!(fetched.client_id, client.client_id);
    assert!(fetched.is_public());
    assert!(fetched.validate_redirect_uri(REDIRECT_URI));

    // Uniqueness parity: saving the same client_id twice should fail.
    let dup = storage.save_client(&client).await;
    assert!(dup.is_err(), "saving the same client_id twice should fail");

    // Bearer pair roundtrip
    let access = AccessToken::new(
        "contract-at-1".to_string(),
        "user-1".to_string(),
        client.client_id.clone(),
        "default".to_string(),
        3600,
    );
    let refresh = RefreshToken::for_access_token("contract-rt-1".to_string(), &access);
    storage.save_bearer_token(&access, Some(&refresh)).await?;

    let fetched_access = storage
        .get_access_token("contract-at-1")
        .await?
        .ok_or_else(|| std::io::Error::other("access token should exist"))?;
    assert_eq!(fetched_access.user_id, "user-1");
    assert!(!fetched_access.is_expired());

    let fetched_refresh = storage
        .get_refresh_token("contract-rt-1")
        .await?
        .ok_or_else(|| std::io::Error::other("refresh token should exist"))?;
    assert!(!fetched_refresh.is_revoked());
    assert_eq!(fetched_refresh.scope, "default");

    // Rotation: the old refresh token is revoked, its access token is gone.
    let next_access = AccessToken::new(
        "contract-at-2".to_string(),
        "user-1".to_string(),
        client.client_id.clone(),
        "default".to_string(),
        3600,
    );
    let next_refresh = RefreshToken::for_access_token("contract-rt-2".to_string(), &next_access);
    storage
        .rotate_refresh_token(&fetched_refresh, &next_access, &next_refresh)
        .await?;

    assert!(storage.get_access_token("contract-at-1").await?.is_none());
    assert!(storage.get_access_token("contract-at-2").await?.is_some());
    let consumed = storage
        .get_refresh_token("contract-rt-1")
        .await?
        .ok_or_else(|| std::io::Error::other("consumed refresh token should remain"))?;
    assert!(consumed.is_revoked());

    // A second rotation of the same token loses.
    let late_access = AccessToken::new(
        "contract-at-3".to_string(),
        "user-1".to_string(),
        client.client_id.clone(),
        "default".to_string(),
        3600,
    );
    let late_refresh = RefreshToken::for_access_token("contract-rt-3".to_string(), &late_access);
    let err = storage
        .rotate_refresh_token(&fetched_refresh, &late_access, &late_refresh)
        .await
        .expect_err("double rotation must fail");
    assert_eq!(err.error, "invalid_grant");
    assert!(storage.get_access_token("contract-at-3").await?.is_none());

    // User-wide deletion
    let counts = storage.count_user_tokens("user-1").await?;
    assert_eq!(counts.access_tokens, 1);
    assert_eq!(counts.refresh_tokens, 2);

    let deleted = storage.delete_user_tokens("user-1").await?;
    assert_eq!(deleted.total(), 3);
    assert_eq!(storage.count_user_tokens("user-1").await?.total(), 0);
    assert_eq!(storage.delete_user_tokens("user-1").await?.total(), 0);

    Ok(())
}
