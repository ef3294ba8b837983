use std::collections::{BTreeMap, HashMap};

use dispatch_core::{join_scopes, Client, GrantType, OAuth2Error, RefreshToken, Scope};
use serde::Serialize;
use url::form_urlencoded;

/// What the bearer generator and the validator need to mint and persist a
/// token pair.
#[derive(Debug, Clone)]
pub struct BearerRequest {
    /// Owner of the new tokens.
    pub user_id: String,
    pub scopes: Vec<Scope>,
    pub client: Client,
    pub grant_type: GrantType,
    pub state: Option<String>,
    /// The refresh token being redeemed; `None` for direct issuance.
    pub refresh_token: Option<RefreshToken>,
    pub extra_credentials: Option<BTreeMap<String, String>>,
}

impl BearerRequest {
    /// Direct issuance for `user_id` on behalf of `client`, using the client's
    /// own grant type.
    pub fn issue(user_id: String, client: Client, scopes: Vec<Scope>) -> Result<Self, OAuth2Error> {
        let grant_type = client.grant_type()?;
        Ok(Self {
            user_id,
            scopes,
            client,
            grant_type,
            state: None,
            refresh_token: None,
            extra_credentials: None,
        })
    }

    /// Redemption of `consumed`; the new pair belongs to the token's owner.
    pub fn refresh(client: Client, consumed: RefreshToken, scopes: Vec<Scope>) -> Self {
        Self {
            user_id: consumed.user_id.clone(),
            scopes,
            client,
            grant_type: GrantType::RefreshToken,
            state: None,
            refresh_token: Some(consumed),
            extra_credentials: None,
        }
    }

    pub fn scope(&self) -> String {
        join_scopes(&self.scopes)
    }
}

/// Form body of a `refresh_token` grant request.
#[derive(Debug, Clone, Serialize)]
pub struct TokenForm {
    pub grant_type: String,
    pub client_id: String,
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenForm {
    pub fn refresh(client_id: &str, refresh_token: &str) -> Self {
        Self {
            grant_type: GrantType::RefreshToken.as_str().to_string(),
            client_id: client_id.to_string(),
            refresh_token: refresh_token.to_string(),
            client_secret: None,
            scope: None,
        }
    }

    pub fn with_client_secret(mut self, client_secret: &str) -> Self {
        self.client_secret = Some(client_secret.to_string());
        self
    }

    pub fn encode(&self) -> Result<String, OAuth2Error> {
        serde_urlencoded::to_string(self).map_err(|e| OAuth2Error::server_error(&e.to_string()))
    }
}

/// Decode an urlencoded body, rejecting repeated parameter names.
pub(crate) fn parse_form_no_dupes(body: &[u8]) -> Result<HashMap<String, String>, OAuth2Error> {
    let mut map: HashMap<String, String> = HashMap::new();
    for (k, v) in form_urlencoded::parse(body) {
        let key = k.into_owned();
        let val = v.into_owned();
        if map.contains_key(&key) {
            return Err(OAuth2Error::invalid_request(
                "Duplicate form parameters are not allowed",
            ));
        }
        map.insert(key, val);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_form_encodes_in_field_order() {
        let body = TokenForm::refresh("my client", "rt/1").encode().unwrap();
        assert_eq!(
            body,
            "grant_type=refresh_token&client_id=my+client&refresh_token=rt%2F1"
        );
    }

    #[test]
    fn duplicate_parameters_are_rejected() {
        let err = parse_form_no_dupes(b"client_id=a&client_id=b").unwrap_err();
        assert_eq!(err.error, "invalid_request");

        let form = parse_form_no_dupes(b"client_id=a&refresh_token=b").unwrap();
        assert_eq!(form.get("client_id").map(String::as_str), Some("a"));
    }

    #[test]
    fn issuance_request_takes_the_client_grant_type() {
        let client = Client::public(
            "c1".into(),
            "app".into(),
            "u1".into(),
            "https://example.com/cb".into(),
        );
        let request = BearerRequest::issue("u1".into(), client, vec![Scope::Default]).unwrap();

        assert_eq!(request.grant_type, GrantType::Password);
        assert_eq!(request.scope(), "default");
        assert!(request.refresh_token.is_none());
        assert!(request.state.is_none());
        assert!(request.extra_credentials.is_none());
    }
}
