use async_trait::async_trait;
use tracing::{field, Instrument};

use dispatch_core::{AccessToken, Client, OAuth2Error, RefreshToken};
use dispatch_ports::{DynStorage, DynTokenStore, Storage, TokenCounts, TokenSchema, TokenStore};

use crate::telemetry::annotate_span_with_trace_ids;

fn db_span(db_system: &str, schema: TokenSchema, operation: &'static str) -> tracing::Span {
    let span = tracing::info_span!(
        "db",
        trace_id = field::Empty,
        span_id = field::Empty,
        db_system = %db_system,
        token_schema = %schema,
        db_operation = operation
    );
    annotate_span_with_trace_ids(&span);
    span
}

fn token_prefix(token: &str) -> String {
    token.chars().take(12).collect::<String>()
}

/// Wraps any `TokenStore` so each call runs inside a `db` span.
pub struct ObservedTokenStore {
    inner: DynTokenStore,
    db_system: String,
}

impl ObservedTokenStore {
    pub fn new(inner: DynTokenStore, db_system: String) -> Self {
        Self { inner, db_system }
    }
}

#[async_trait]
impl TokenStore for ObservedTokenStore {
    fn schema(&self) -> TokenSchema {
        self.inner.schema()
    }

    async fn init(&self) -> Result<(), OAuth2Error> {
        let span = db_span(&self.db_system, self.schema(), "init");
        async move { self.inner.init().await }.instrument(span).await
    }

    async fn delete_user_tokens(&self, user_id: &str) -> Result<TokenCounts, OAuth2Error> {
        let span = db_span(&self.db_system, self.schema(), "delete_user_tokens");
        async move {
            let deleted = self.inner.delete_user_tokens(user_id).await?;
            tracing::debug!(
                user_id = %user_id,
                access_tokens = deleted.access_tokens,
                refresh_tokens = deleted.refresh_tokens,
                "deleted user tokens"
            );
            Ok(deleted)
        }
        .instrument(span)
        .await
    }

    async fn count_user_tokens(&self, user_id: &str) -> Result<TokenCounts, OAuth2Error> {
        let span = db_span(&self.db_system, self.schema(), "count_user_tokens");
        async move { self.inner.count_user_tokens(user_id).await }
            .instrument(span)
            .await
    }

    async fn healthcheck(&self) -> Result<(), OAuth2Error> {
        let span = db_span(&self.db_system, self.schema(), "healthcheck");
        async move { self.inner.healthcheck().await }
            .instrument(span)
            .await
    }
}

/// A thin wrapper around a `DynStorage` that creates a tracing span for each
/// storage call, so facade spans extend down into persistence.
pub struct ObservedStorage {
    inner: DynStorage,
    db_system: String,
}

impl ObservedStorage {
    pub fn new(inner: DynStorage, db_system: String) -> Self {
        Self { inner, db_system }
    }

    fn span(&self, operation: &'static str) -> tracing::Span {
        db_span(&self.db_system, self.inner.schema(), operation)
    }
}

#[async_trait]
impl TokenStore for ObservedStorage {
    fn schema(&self) -> TokenSchema {
        self.inner.schema()
    }

    async fn init(&self) -> Result<(), OAuth2Error> {
        let span = self.span("init");
        async move { self.inner.init().await }.instrument(span).await
    }

    async fn delete_user_tokens(&self, user_id: &str) -> Result<TokenCounts, OAuth2Error> {
        let span = self.span("delete_user_tokens");
        async move {
            let deleted = self.inner.delete_user_tokens(user_id).await?;
            tracing::debug!(
                user_id = %user_id,
                access_tokens = deleted.access_tokens,
                refresh_tokens = deleted.refresh_tokens,
                "deleted user tokens"
            );
            Ok(deleted)
        }
        .instrument(span)
        .await
    }

    async fn count_user_tokens(&self, user_id: &str) -> Result<TokenCounts, OAuth2Error> {
        let span = self.span("count_user_tokens");
        async move { self.inner.count_user_tokens(user_id).await }
            .instrument(span)
            .await
    }

    async fn healthcheck(&self) -> Result<(), OAuth2Error> {
        let span = self.span("healthcheck");
        async move { self.inner.healthcheck().await }
            .instrument(span)
            .await
    }
}

#[async_trait]
impl Storage for ObservedStorage {
    async fn save_client(&self, client: &Client) -> Result<(), OAuth2Error> {
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = "save_client",
            client_id = %client.client_id
        );
        annotate_span_with_trace_ids(&span);
        async move { self.inner.save_client(client).await }
            .instrument(span)
            .await
    }

    async fn get_client(&self, client_id: &str) -> Result<Option<Client>, OAuth2Error> {
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = "get_client",
            client_id = %client_id
        );
        annotate_span_with_trace_ids(&span);
        async move { self.inner.get_client(client_id).await }
            .instrument(span)
            .await
    }

    async fn save_bearer_token(
        &self,
        access_token: &AccessToken,
        refresh_token: Option<&RefreshToken>,
    ) -> Result<(), OAuth2Error> {
        // Never log full tokens.
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = "save_bearer_token",
            token_prefix = %token_prefix(&access_token.token),
            client_id = %access_token.client_id,
            user_id = %access_token.user_id,
            with_refresh = refresh_token.is_some()
        );
        annotate_span_with_trace_ids(&span);
        async move { self.inner.save_bearer_token(access_token, refresh_token).await }
            .instrument(span)
            .await
    }

    async fn get_access_token(&self, token: &str) -> Result<Option<AccessToken>, OAuth2Error> {
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = "get_access_token",
            token_prefix = %token_prefix(token),
            token_len = token.len()
        );
        annotate_span_with_trace_ids(&span);
        async move { self.inner.get_access_token(token).await }
            .instrument(span)
            .await
    }

    async fn get_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, OAuth2Error> {
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = "get_refresh_token",
            token_prefix = %token_prefix(token),
            token_len = token.len()
        );
        annotate_span_with_trace_ids(&span);
        async move { self.inner.get_refresh_token(token).await }
            .instrument(span)
            .await
    }

    async fn rotate_refresh_token(
        &self,
        consumed: &RefreshToken,
        access_token: &AccessToken,
        refresh_token: &RefreshToken,
    ) -> Result<(), OAuth2Error> {
        let span = tracing::info_span!(
            "db",
            trace_id = field::Empty,
            span_id = field::Empty,
            db_system = %self.db_system,
            db_operation = "rotate_refresh_token",
            consumed_prefix = %token_prefix(&consumed.token),
            client_id = %consumed.client_id,
            user_id = %consumed.user_id
        );
        annotate_span_with_trace_ids(&span);
        async move {
            self.inner
                .rotate_refresh_token(consumed, access_token, refresh_token)
                .await
        }
        .instrument(span)
        .await
    }
}
