use std::sync::Arc;

use async_trait::async_trait;
use dispatch_config::OAuthConfig;
use dispatch_core::{AccessToken, Client, OAuth2Error, RefreshToken, TokenResponse};
use dispatch_ports::DynStorage;
use subtle::ConstantTimeEq;

use super::request::BearerRequest;

/// The checks and persistence hooks the token pipeline delegates to.
#[async_trait]
pub trait RequestValidator: Send + Sync {
    /// Look up `client_id` and authenticate it. Public clients need no
    /// secret; confidential clients must present theirs.
    async fn authenticate_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<Client, OAuth2Error>;

    /// Resolve `token` to a live refresh token issued to `client`.
    async fn validate_refresh_token(
        &self,
        token: &str,
        client: &Client,
    ) -> Result<RefreshToken, OAuth2Error>;

    /// Persist the pair in `token`. May rewrite `token.expires_in` to the
    /// lifetime actually stored.
    async fn save_bearer_token(
        &self,
        token: &mut TokenResponse,
        request: &BearerRequest,
    ) -> Result<(), OAuth2Error>;
}

pub type DynRequestValidator = Arc<dyn RequestValidator>;

/// `RequestValidator` backed by the current-schema storage.
///
/// Access token lifetime is a single global setting: whatever the generator
/// was asked for, tokens are stored (and reported) with
/// `access_token_expire_seconds`.
pub struct StorageValidator {
    storage: DynStorage,
    access_token_expire_seconds: i64,
    refresh_token_expire_seconds: Option<i64>,
}

impl StorageValidator {
    pub fn new(storage: DynStorage, oauth: &OAuthConfig) -> Self {
        Self {
            storage,
            access_token_expire_seconds: oauth.access_token_expire_seconds,
            refresh_token_expire_seconds: oauth.refresh_token_expire_seconds,
        }
    }
}

#[async_trait]
impl RequestValidator for StorageValidator {
    async fn authenticate_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<Client, OAuth2Error> {
        let client = self
            .storage
            .get_client(client_id)
            .await?
            .ok_or_else(|| OAuth2Error::invalid_client("Client not found"))?;

        if client.is_public() {
            return Ok(client);
        }

        let secret =
            client_secret.ok_or_else(|| OAuth2Error::invalid_client("Missing client_secret"))?;
        let matches: bool = secret
            .as_bytes()
            .ct_eq(client.client_secret.as_bytes())
            .into();
        if !matches {
            return Err(OAuth2Error::invalid_client("Invalid client_secret"));
        }

        Ok(client)
    }

    async fn validate_refresh_token(
        &self,
        token: &str,
        client: &Client,
    ) -> Result<RefreshToken, OAuth2Error> {
        let refresh_token = self
            .storage
            .get_refresh_token(token)
            .await?
            .ok_or_else(|| OAuth2Error::invalid_grant("Refresh token not found"))?;

        if refresh_token.client_id != client.client_id {
            return Err(OAuth2Error::invalid_client(
                "Refresh token was not issued to this client",
            ));
        }
        if refresh_token.is_revoked() {
            return Err(OAuth2Error::invalid_grant(
                "Refresh token has already been used",
            ));
        }
        if refresh_token.is_expired(self.refresh_token_expire_seconds) {
            return Err(OAuth2Error::invalid_grant("Refresh token has expired"));
        }

        Ok(refresh_token)
    }

    async fn save_bearer_token(
        &self,
        token: &mut TokenResponse,
        request: &BearerRequest,
    ) -> Result<(), OAuth2Error> {
        let expires_in = self.access_token_expire_seconds;
        if token.expires_in != expires_in {
            tracing::debug!(
                requested = token.expires_in,
                applied = expires_in,
                "Access token lifetime is configured globally; requested lifetime not applied"
            );
        }

        let mut access_token = AccessToken::new(
            token.access_token.clone(),
            request.user_id.clone(),
            request.client.client_id.clone(),
            token.scope.clone(),
            expires_in,
        );

        match &request.refresh_token {
            Some(consumed) => {
                access_token.source_refresh_token_id = Some(consumed.id.clone());
                let refresh_token =
                    RefreshToken::for_access_token(token.refresh_token.clone(), &access_token);
                self.storage
                    .rotate_refresh_token(consumed, &access_token, &refresh_token)
                    .await?;
            }
            None => {
                let refresh_token =
                    RefreshToken::for_access_token(token.refresh_token.clone(), &access_token);
                self.storage
                    .save_bearer_token(&access_token, Some(&refresh_token))
                    .await?;
            }
        }

        token.expires_in = expires_in;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::{GrantType, Scope, CLIENT_TYPE_CONFIDENTIAL};
    use dispatch_ports::TokenStore;

    async fn storage(dir: &tempfile::TempDir) -> DynStorage {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("tokens.db").display());
        let storage = dispatch_storage_factory::create_storage(&url).await.unwrap();
        storage.init().await.unwrap();
        storage
    }

    fn confidential_client() -> Client {
        Client::new(
            "confidential-app".into(),
            "s3cret".into(),
            CLIENT_TYPE_CONFIDENTIAL,
            GrantType::Password,
            vec!["https://example.com/cb".into()],
            "Confidential".into(),
            None,
        )
    }

    #[tokio::test]
    async fn confidential_clients_must_present_their_secret() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir).await;
        storage.save_client(&confidential_client()).await.unwrap();
        let validator = StorageValidator::new(storage, &OAuthConfig::default());

        let missing = validator
            .authenticate_client("confidential-app", None)
            .await
            .unwrap_err();
        assert_eq!(missing.error, "invalid_client");

        let wrong = validator
            .authenticate_client("confidential-app", Some("nope"))
            .await
            .unwrap_err();
        assert_eq!(wrong.error, "invalid_client");

        let client = validator
            .authenticate_client("confidential-app", Some("s3cret"))
            .await
            .unwrap();
        assert_eq!(client.client_id, "confidential-app");

        let unknown = validator
            .authenticate_client("nobody", None)
            .await
            .unwrap_err();
        assert_eq!(unknown.error, "invalid_client");
    }

    #[tokio::test]
    async fn saved_pairs_use_the_global_lifetime() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir).await;
        let client = Client::public(
            "public-app".into(),
            "Public".into(),
            "u1".into(),
            "https://example.com/cb".into(),
        );
        storage.save_client(&client).await.unwrap();

        let oauth = OAuthConfig {
            access_token_expire_seconds: 120,
            ..OAuthConfig::default()
        };
        let validator = StorageValidator::new(storage.clone(), &oauth);
        let request = BearerRequest::issue("u1".into(), client, vec![Scope::Read]).unwrap();
        let mut token =
            TokenResponse::bearer("access-1".into(), "refresh-1".into(), 9999, request.scope());

        validator.save_bearer_token(&mut token, &request).await.unwrap();

        assert_eq!(token.expires_in, 120);
        let stored = storage.get_access_token("access-1").await.unwrap().unwrap();
        assert_eq!(stored.scope, "read");
        assert_eq!(stored.user_id, "u1");
        let refresh = storage.get_refresh_token("refresh-1").await.unwrap().unwrap();
        assert_eq!(refresh.access_token_id.as_deref(), Some(stored.id.as_str()));
    }
}
