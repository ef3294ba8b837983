use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::OAuth2Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    Implicit,
    Password,
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::Implicit => "implicit",
            GrantType::Password => "password",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
        }
    }

    /// Whether tokens issued under this registration may be refreshed.
    pub fn allows_refresh(self) -> bool {
        !matches!(self, GrantType::Implicit)
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = OAuth2Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(GrantType::AuthorizationCode),
            "implicit" => Ok(GrantType::Implicit),
            "password" => Ok(GrantType::Password),
            "client_credentials" => Ok(GrantType::ClientCredentials),
            "refresh_token" => Ok(GrantType::RefreshToken),
            other => Err(OAuth2Error::unsupported_grant_type(&format!(
                "Grant type '{other}' not supported"
            ))),
        }
    }
}

pub const CLIENT_TYPE_PUBLIC: &str = "public";
pub const CLIENT_TYPE_CONFIDENTIAL: &str = "confidential";

/// A registered OAuth2 application.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub client_id: String,
    pub client_secret: String,
    pub client_type: String,
    pub authorization_grant_type: String,
    /// Space-separated list of allowed redirect URIs.
    pub redirect_uris: String,
    pub name: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(
        client_id: String,
        client_secret: String,
        client_type: &str,
        grant_type: GrantType,
        redirect_uris: Vec<String>,
        name: String,
        user_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            client_id,
            client_secret,
            client_type: client_type.to_string(),
            authorization_grant_type: grant_type.as_str().to_string(),
            redirect_uris: redirect_uris.join(" "),
            name,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// A public (secret-less) client using the password grant.
    pub fn public(client_id: String, name: String, user_id: String, redirect_uri: String) -> Self {
        Self::new(
            client_id,
            String::new(),
            CLIENT_TYPE_PUBLIC,
            GrantType::Password,
            vec![redirect_uri],
            name,
            Some(user_id),
        )
    }

    pub fn is_public(&self) -> bool {
        self.client_type == CLIENT_TYPE_PUBLIC
    }

    pub fn grant_type(&self) -> Result<GrantType, OAuth2Error> {
        self.authorization_grant_type.parse()
    }

    pub fn validate_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.split_whitespace().any(|u| u == uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_client_uses_password_grant() {
        let client = Client::public(
            "public-client-id".to_string(),
            "public app".to_string(),
            "user-1".to_string(),
            "https://app.example/cb".to_string(),
        );

        assert!(client.is_public());
        assert!(client.client_secret.is_empty());
        assert_eq!(client.grant_type().unwrap(), GrantType::Password);
        assert!(client.validate_redirect_uri("https://app.example/cb"));
        assert!(!client.validate_redirect_uri("https://evil.example/cb"));
    }

    #[test]
    fn implicit_registrations_cannot_refresh() {
        assert!(!GrantType::Implicit.allows_refresh());
        assert!(GrantType::Password.allows_refresh());
        assert!(GrantType::AuthorizationCode.allows_refresh());
    }

    #[test]
    fn unknown_grant_type_is_rejected() {
        let err = "device_code".parse::<GrantType>().unwrap_err();
        assert_eq!(err.error, "unsupported_grant_type");
    }
}
