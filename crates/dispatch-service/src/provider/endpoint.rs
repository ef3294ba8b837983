use std::collections::HashMap;

use dispatch_core::{parse_scopes, GrantType, OAuth2Error, RefreshToken, Scope, TokenResponse, User};

use super::generator::BearerTokenGenerator;
use super::request::{parse_form_no_dupes, BearerRequest};
use super::validator::DynRequestValidator;

pub const TOKEN_URI: &str = "/oauth2/token";

/// An urlencoded token request, plus the user it was made for (if known).
#[derive(Debug, Clone)]
pub struct TokenEndpointRequest {
    pub uri: String,
    pub body: String,
    pub user: Option<User>,
}

impl TokenEndpointRequest {
    pub fn new(body: String, user: Option<User>) -> Self {
        Self {
            uri: TOKEN_URI.to_string(),
            body,
            user,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenEndpointResponse {
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub status: u16,
}

impl TokenEndpointResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Token endpoint serving the `refresh_token` grant.
pub struct TokenEndpoint {
    validator: DynRequestValidator,
    generator: BearerTokenGenerator,
}

impl TokenEndpoint {
    pub fn new(validator: DynRequestValidator, expires_in: i64) -> Self {
        Self {
            generator: BearerTokenGenerator::new(validator.clone(), expires_in),
            validator,
        }
    }

    /// Run the grant and render the outcome the way an HTTP token endpoint
    /// would: JSON body, status code and cache headers.
    pub async fn create_token_response(&self, request: TokenEndpointRequest) -> TokenEndpointResponse {
        let outcome = self
            .handle(&request)
            .await
            .and_then(|token| serde_json::to_string(&token).map_err(server_error));

        let (status, body) = match outcome {
            Ok(body) => (200, body),
            Err(err) => {
                tracing::info!(
                    error = %err.error,
                    error_description = err.error_description.as_deref().unwrap_or(""),
                    "Token request rejected"
                );
                let body = serde_json::to_string(&err).unwrap_or_else(|_| {
                    r#"{"error":"server_error"}"#.to_string()
                });
                (err.status_code(), body)
            }
        };

        TokenEndpointResponse {
            uri: request.uri,
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Cache-Control".to_string(), "no-store".to_string()),
                ("Pragma".to_string(), "no-cache".to_string()),
            ],
            body,
            status,
        }
    }

    async fn handle(&self, request: &TokenEndpointRequest) -> Result<TokenResponse, OAuth2Error> {
        let form = parse_form_no_dupes(request.body.as_bytes())?;

        let grant_type = required(&form, "grant_type")?;
        match grant_type.parse::<GrantType>() {
            Ok(GrantType::RefreshToken) => {
                self.refresh_token_grant(&form, request.user.as_ref()).await
            }
            _ => Err(OAuth2Error::unsupported_grant_type(&format!(
                "Unsupported grant_type: {}",
                grant_type
            ))),
        }
    }

    async fn refresh_token_grant(
        &self,
        form: &HashMap<String, String>,
        user: Option<&User>,
    ) -> Result<TokenResponse, OAuth2Error> {
        // An absent client cannot have been issued the token.
        let client_id = required(form, "client_id")
            .map_err(|_| OAuth2Error::invalid_client("Missing client_id"))?;
        let refresh_token = required(form, "refresh_token")?;

        let client = self
            .validator
            .authenticate_client(client_id, form.get("client_secret").map(String::as_str))
            .await?;

        if !client.grant_type()?.allows_refresh() {
            return Err(OAuth2Error::unauthorized_client(
                "Client is not allowed to use refresh_token",
            ));
        }

        let consumed = self
            .validator
            .validate_refresh_token(refresh_token, &client)
            .await?;

        if let Some(user) = user {
            if user.id != consumed.user_id {
                return Err(OAuth2Error::invalid_grant(
                    "Refresh token does not belong to this user",
                ));
            }
        }

        let scopes = refreshed_scopes(&consumed, form.get("scope").map(String::as_str))?;
        let bearer = BearerRequest::refresh(client, consumed, scopes);
        self.generator.create_token(&bearer).await
    }
}

fn required<'a>(form: &'a HashMap<String, String>, name: &str) -> Result<&'a str, OAuth2Error> {
    form.get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OAuth2Error::invalid_request(&format!("Missing {}", name)))
}

/// Scopes for the new pair: the original grant, or a subset of it when the
/// request narrows it.
fn refreshed_scopes(
    consumed: &RefreshToken,
    requested: Option<&str>,
) -> Result<Vec<Scope>, OAuth2Error> {
    let original = parse_scopes(&consumed.scope)
        .map_err(|e| OAuth2Error::invalid_scope(&e.to_string()))?;

    let requested = match requested {
        Some(requested) => {
            parse_scopes(requested).map_err(|e| OAuth2Error::invalid_scope(&e.to_string()))?
        }
        None => Vec::new(),
    };

    if requested.is_empty() {
        return Ok(original);
    }
    if requested.iter().any(|scope| !original.contains(scope)) {
        return Err(OAuth2Error::invalid_scope(
            "Requested scope exceeds the original grant",
        ));
    }

    Ok(requested)
}

fn server_error(err: serde_json::Error) -> OAuth2Error {
    OAuth2Error::server_error(&err.to_string())
}
