//! JWT issuance for API clients, OAuth applications and user logins.

use chrono::Utc;
use dispatch_config::JwtConfig;
use dispatch_core::{Scope, User};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::DispatchError;

/// Claims added by the `profile` scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileClaims {
    pub name: Option<String>,
    pub family_name: String,
    pub given_name: String,
    pub administrator: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtClaims {
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub preferred_username: String,
    pub scopes: Vec<String>,
    pub version: String,
    /// Anonymous user id, never the raw user id.
    pub sub: String,
    pub filters: Vec<String>,
    pub is_restricted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub profile: Option<ProfileClaims>,
}

/// Signs JWTs with the shared secret (HS256) or, for restricted and login
/// tokens, with the configured private key.
#[derive(Debug, Clone)]
pub struct JwtIssuer {
    config: JwtConfig,
}

impl JwtIssuer {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    /// JWT for API clients calling other services on a user's behalf.
    pub fn create_api_client_jwt(&self, user: &User) -> Result<String, DispatchError> {
        let claims = self.claims(user, &[], None, false, &[]);
        self.encode(&claims, false)
    }

    /// JWT for an OAuth application. Restricted applications get the
    /// asymmetric key when scope enforcement is on.
    pub fn create_app_access_jwt(
        &self,
        user: &User,
        scopes: &[String],
        expires_in: Option<i64>,
        is_restricted: bool,
        filters: &[String],
    ) -> Result<String, DispatchError> {
        let use_asymmetric_key = self.config.enforce_scopes && is_restricted;
        let claims = self.claims(user, scopes, expires_in, is_restricted, filters);
        self.encode(&claims, use_asymmetric_key)
    }

    /// JWT handed to an end user at login; always asymmetrically signed.
    pub fn create_user_login_jwt(&self, user: &User, expires_in: i64) -> Result<String, DispatchError> {
        let claims = self.claims(user, &[], Some(expires_in), false, &[]);
        self.encode(&claims, true)
    }

    pub fn anonymous_id(&self, user: &User) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.config.anonymous_id_secret.as_bytes());
        hasher.update(user.id.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Verify and decode a token signed with the shared secret.
    pub fn decode_symmetric(&self, token: &str) -> Result<JwtClaims, DispatchError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);

        let data = jsonwebtoken::decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.config.secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }

    fn claims(
        &self,
        user: &User,
        scopes: &[String],
        expires_in: Option<i64>,
        is_restricted: bool,
        filters: &[String],
    ) -> JwtClaims {
        let scopes: Vec<String> = if scopes.is_empty() {
            vec![Scope::Email.to_string(), Scope::Profile.to_string()]
        } else {
            scopes.to_vec()
        };
        let expires_in = expires_in
            .filter(|seconds| *seconds != 0)
            .unwrap_or(self.config.expiration_seconds);
        let now = Utc::now().timestamp();

        let mut claims = JwtClaims {
            aud: self.config.audience.clone(),
            exp: now.saturating_add(expires_in),
            iat: now,
            iss: self.config.issuer.clone(),
            preferred_username: user.username.clone(),
            scopes,
            version: self.config.supported_version.clone(),
            sub: self.anonymous_id(user),
            filters: filters.to_vec(),
            is_restricted,
            email: None,
            profile: None,
        };

        for scope in claims.scopes.clone() {
            match scope.parse::<Scope>() {
                Ok(Scope::Email) => claims.email = Some(user.email.clone()),
                Ok(Scope::Profile) => {
                    claims.profile = Some(ProfileClaims {
                        name: user.name.clone(),
                        family_name: user.last_name.clone(),
                        given_name: user.first_name.clone(),
                        administrator: user.is_staff,
                    })
                }
                _ => {}
            }
        }

        tracing::debug!(expires_in, is_restricted, "JWT claims built");
        claims
    }

    fn encode(&self, claims: &JwtClaims, use_asymmetric_key: bool) -> Result<String, DispatchError> {
        let (header, key) = if use_asymmetric_key {
            self.asymmetric_key()?
        } else {
            (
                Header::new(Algorithm::HS256),
                EncodingKey::from_secret(self.config.secret.as_bytes()),
            )
        };

        tracing::debug!(algorithm = ?header.alg, asymmetric = use_asymmetric_key, "Signing JWT");
        Ok(jsonwebtoken::encode(&header, claims, &key)?)
    }

    fn asymmetric_key(&self) -> Result<(Header, EncodingKey), DispatchError> {
        let algorithm: Algorithm = self
            .config
            .signing_algorithm
            .parse()
            .map_err(|e: jsonwebtoken::errors::Error| DispatchError::Jwt(e.to_string()))?;
        let pem = self
            .config
            .private_signing_key
            .as_deref()
            .ok_or_else(|| DispatchError::Jwt("no private signing key configured".to_string()))?
            .as_bytes();

        let key = match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => EncodingKey::from_rsa_pem(pem)?,
            Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(pem)?,
            Algorithm::EdDSA => EncodingKey::from_ed_pem(pem)?,
            other => {
                return Err(DispatchError::Jwt(format!(
                    "{:?} is not an asymmetric signing algorithm",
                    other
                )))
            }
        };

        Ok((Header::new(algorithm), key))
    }
}
