use std::sync::Arc;

use dispatch_config::{Config, OAuthConfig};
use dispatch_core::{Client, OAuth2Error, Scope, TokenResponse, User};
use dispatch_observability::{annotate_span_with_trace_ids, Metrics};
use dispatch_ports::{DynStorage, DynTokenStore, TokenCounts, TokenSchema};
use dispatch_storage_factory::TokenBackends;
use serde::Serialize;
use tracing::Instrument;

use crate::error::DispatchError;
use crate::provider::{
    generate_token, BearerRequest, BearerTokenGenerator, DynRequestValidator, StorageValidator,
    TokenEndpoint, TokenEndpointRequest, TokenForm,
};

/// Per-schema result of a user-wide revocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DestroyedTokens {
    pub per_schema: Vec<(TokenSchema, TokenCounts)>,
}

impl DestroyedTokens {
    pub fn get(&self, schema: TokenSchema) -> Option<TokenCounts> {
        self.per_schema
            .iter()
            .find(|(s, _)| *s == schema)
            .map(|(_, counts)| *counts)
    }

    pub fn total(&self) -> u64 {
        self.per_schema.iter().map(|(_, counts)| counts.total()).sum()
    }
}

/// Issues, refreshes and revokes OAuth2 tokens on behalf of platform users.
#[derive(Clone)]
pub struct OAuthDispatch {
    storage: DynStorage,
    stores: Vec<DynTokenStore>,
    validator: DynRequestValidator,
    oauth: OAuthConfig,
    metrics: Option<Metrics>,
}

impl OAuthDispatch {
    pub fn new(backends: TokenBackends, oauth: OAuthConfig) -> Self {
        let validator: DynRequestValidator =
            Arc::new(StorageValidator::new(backends.storage.clone(), &oauth));
        Self {
            storage: backends.storage,
            stores: backends.stores,
            validator,
            oauth,
            metrics: None,
        }
    }

    /// Open, bootstrap and wire every token store named in `config`.
    pub async fn connect(config: &Config) -> Result<Self, DispatchError> {
        config.validate().map_err(DispatchError::Config)?;
        let backends = dispatch_storage_factory::create_backends(&config.database)
            .await
            .map_err(DispatchError::Storage)?;
        backends.init().await.map_err(DispatchError::Storage)?;

        tracing::info!(
            stores = backends.stores.len(),
            access_token_expire_seconds = config.oauth.access_token_expire_seconds,
            "Token stores ready"
        );
        Ok(Self::new(backends, config.oauth.clone()))
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Swap the validator the issuance and refresh pipelines use.
    pub fn with_validator(mut self, validator: DynRequestValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn oauth_config(&self) -> &OAuthConfig {
        &self.oauth
    }

    /// Lifetime requested from the generator: `expires_in` when given and
    /// non-zero, otherwise the public-client default.
    ///
    /// The validator stores `access_token_expire_seconds` regardless, so this
    /// value never reaches a token record.
    pub fn resolve_expires_in(&self, expires_in: Option<i64>) -> i64 {
        match expires_in {
            Some(seconds) if seconds != 0 => seconds,
            _ => self.oauth.public_client_expires_in(),
        }
    }

    /// Register a public application owned by `user`.
    pub async fn create_public_client(
        &self,
        name: &str,
        user: &User,
        redirect_uri: &str,
        client_id: Option<&str>,
    ) -> Result<Client, DispatchError> {
        let client_id = client_id.map(str::to_string).unwrap_or_else(generate_token);
        let client = Client::public(
            client_id,
            name.to_string(),
            user.id.clone(),
            redirect_uri.to_string(),
        );

        self.storage
            .save_client(&client)
            .await
            .map_err(DispatchError::Storage)?;

        tracing::info!(client_id = %client.client_id, user_id = %user.id, "Public client created");
        Ok(client)
    }

    /// Mint a new access/refresh token pair for `user` on behalf of `client`.
    ///
    /// `scope` is a key into the scope table (default `0`). Unknown keys fail
    /// before anything is persisted.
    pub async fn create_access_token(
        &self,
        user: &User,
        client: &Client,
        expires_in: Option<i64>,
        scope: Option<u32>,
    ) -> Result<TokenResponse, DispatchError> {
        let scope_key = scope.unwrap_or(Scope::DEFAULT_KEY);
        let span = tracing::info_span!(
            "dispatch.token.issue",
            trace_id = tracing::field::Empty,
            span_id = tracing::field::Empty,
            user_id = %user.id,
            client_id = %client.client_id,
            scope_key
        );
        annotate_span_with_trace_ids(&span);

        self.issue(user, client, expires_in, scope_key)
            .instrument(span)
            .await
    }

    async fn issue(
        &self,
        user: &User,
        client: &Client,
        expires_in: Option<i64>,
        scope_key: u32,
    ) -> Result<TokenResponse, DispatchError> {
        let scope = Scope::from_key(scope_key)?;
        let requested = self.resolve_expires_in(expires_in);

        let request = BearerRequest::issue(user.id.clone(), client.clone(), vec![scope])
            .map_err(DispatchError::Protocol)?;
        let generator = BearerTokenGenerator::new(self.validator.clone(), requested);
        let token = generator
            .create_token(&request)
            .await
            .map_err(DispatchError::Storage)?;

        if let Some(metrics) = &self.metrics {
            metrics.tokens_issued_total.inc();
        }
        tracing::info!(
            scope = %token.scope,
            expires_in = token.expires_in,
            requested_expires_in = requested,
            "Access token issued"
        );

        Ok(token)
    }

    /// Redeem `refresh_token` through the token endpoint.
    ///
    /// On success both tokens are new and the old pair is dead. Any rejection
    /// comes back as `DispatchError::Protocol` with the endpoint's error code.
    pub async fn refresh_access_token(
        &self,
        user: &User,
        client_id: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, DispatchError> {
        let span = tracing::info_span!(
            "dispatch.token.refresh",
            trace_id = tracing::field::Empty,
            span_id = tracing::field::Empty,
            user_id = %user.id,
            client_id = %client_id,
            status = tracing::field::Empty
        );
        annotate_span_with_trace_ids(&span);

        self.redeem(user, client_id, refresh_token)
            .instrument(span)
            .await
    }

    async fn redeem(
        &self,
        user: &User,
        client_id: &str,
        refresh_token: &str,
    ) -> Result<TokenResponse, DispatchError> {
        let body = TokenForm::refresh(client_id, refresh_token)
            .encode()
            .map_err(DispatchError::Protocol)?;
        let endpoint = TokenEndpoint::new(self.validator.clone(), self.resolve_expires_in(None));

        let response = endpoint
            .create_token_response(TokenEndpointRequest::new(body, Some(user.clone())))
            .await;
        tracing::Span::current().record("status", response.status);

        if response.status == 200 {
            let token: TokenResponse = serde_json::from_str(&response.body)
                .map_err(|e| DispatchError::MalformedResponse(e.to_string()))?;
            if let Some(metrics) = &self.metrics {
                metrics.tokens_refreshed_total.inc();
            }
            tracing::info!(scope = %token.scope, "Refresh token redeemed");
            return Ok(token);
        }

        let err: OAuth2Error = serde_json::from_str(&response.body)
            .map_err(|e| DispatchError::MalformedResponse(e.to_string()))?;
        if let Some(metrics) = &self.metrics {
            metrics
                .refresh_failures_total
                .with_label_values(&[err.error.as_str()])
                .inc();
        }
        tracing::warn!(error = %err, "Refresh token rejected");

        Err(DispatchError::Protocol(err))
    }

    /// Delete every token `user` owns, in every schema.
    ///
    /// Stores are cleared one after another without a shared transaction;
    /// the first failing store aborts the rest. Running it twice is harmless.
    pub async fn destroy_oauth_tokens(&self, user: &User) -> Result<DestroyedTokens, DispatchError> {
        let span = tracing::info_span!(
            "dispatch.token.destroy",
            trace_id = tracing::field::Empty,
            span_id = tracing::field::Empty,
            user_id = %user.id
        );
        annotate_span_with_trace_ids(&span);

        self.destroy(user).instrument(span).await
    }

    async fn destroy(&self, user: &User) -> Result<DestroyedTokens, DispatchError> {
        let mut destroyed = DestroyedTokens::default();

        for store in &self.stores {
            let schema = store.schema();
            let counts = store
                .delete_user_tokens(&user.id)
                .await
                .map_err(DispatchError::Storage)?;

            if let Some(metrics) = &self.metrics {
                metrics
                    .tokens_destroyed_total
                    .with_label_values(&[schema.as_str()])
                    .inc_by(counts.total());
            }
            tracing::info!(
                schema = schema.as_str(),
                access_tokens = counts.access_tokens,
                refresh_tokens = counts.refresh_tokens,
                "User tokens destroyed"
            );

            destroyed.per_schema.push((schema, counts));
        }

        Ok(destroyed)
    }
}
