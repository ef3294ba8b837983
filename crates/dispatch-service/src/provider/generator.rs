use dispatch_core::{OAuth2Error, TokenResponse};
use rand::Rng;

use super::request::BearerRequest;
use super::validator::DynRequestValidator;

/// Length of generated access and refresh token strings.
pub const TOKEN_LENGTH: usize = 30;

/// Mints bearer token pairs and hands them to the validator for persistence.
pub struct BearerTokenGenerator {
    validator: DynRequestValidator,
    expires_in: i64,
}

impl BearerTokenGenerator {
    pub fn new(validator: DynRequestValidator, expires_in: i64) -> Self {
        Self {
            validator,
            expires_in,
        }
    }

    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }

    /// Mint an access token plus a refresh token for `request` and persist
    /// both. The returned `expires_in` is whatever the validator stored.
    pub async fn create_token(&self, request: &BearerRequest) -> Result<TokenResponse, OAuth2Error> {
        let mut token = TokenResponse::bearer(
            generate_token(),
            generate_token(),
            self.expires_in,
            request.scope(),
        );

        self.validator.save_bearer_token(&mut token, request).await?;

        tracing::debug!(
            client_id = %request.client.client_id,
            grant_type = request.grant_type.as_str(),
            expires_in = token.expires_in,
            "Bearer token pair created"
        );

        Ok(token)
    }
}

/// Random alphanumeric token string.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..62);
            match idx {
                0..=25 => (b'a' + idx) as char,
                26..=51 => (b'A' + (idx - 26)) as char,
                _ => (b'0' + (idx - 52)) as char,
            }
        })
        .collect()
}
