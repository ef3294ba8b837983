use hocon::HoconLoader;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Upper bound for every configured token lifetime (100 years).
pub const MAX_LIFETIME_SECONDS: i64 = 100 * 365 * SECONDS_PER_DAY;

const INSECURE_JWT_SECRET: &str = "insecure-default-for-testing-only-change-in-production";
const MASKED: &str = "***MASKED***";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub jwt: JwtConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Legacy token tables; same database as `url` when unset.
    #[serde(default)]
    pub legacy_url: Option<String>,
}

impl DatabaseConfig {
    pub fn legacy_url(&self) -> &str {
        self.legacy_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            legacy_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OAuthConfig {
    /// Requested lifetime for tokens minted without an explicit `expires_in`.
    #[serde(default = "default_expire_public_client_days")]
    pub expire_public_client_days: i64,
    /// Lifetime actually persisted (and reported) for every access token.
    #[serde(default = "default_access_token_expire_seconds")]
    pub access_token_expire_seconds: i64,
    /// `None` means refresh tokens never expire.
    #[serde(default)]
    pub refresh_token_expire_seconds: Option<i64>,
}

impl OAuthConfig {
    pub fn public_client_expires_in(&self) -> i64 {
        self.expire_public_client_days.saturating_mul(SECONDS_PER_DAY)
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            expire_public_client_days: default_expire_public_client_days(),
            access_token_expire_seconds: default_access_token_expire_seconds(),
            refresh_token_expire_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    #[serde(default = "default_jwt_secret")]
    pub secret: String,
    #[serde(default = "default_jwt_issuer")]
    pub issuer: String,
    #[serde(default = "default_jwt_audience")]
    pub audience: String,
    #[serde(default = "default_jwt_expiration_seconds")]
    pub expiration_seconds: i64,
    #[serde(default = "default_jwt_supported_version")]
    pub supported_version: String,
    #[serde(default = "default_jwt_signing_algorithm")]
    pub signing_algorithm: String,
    /// PEM-encoded private key for asymmetric signing.
    #[serde(default)]
    pub private_signing_key: Option<String>,
    #[serde(default = "default_jwt_secret")]
    pub anonymous_id_secret: String,
    /// Sign restricted-application tokens with the asymmetric key.
    #[serde(default)]
    pub enforce_scopes: bool,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_jwt_secret(),
            issuer: default_jwt_issuer(),
            audience: default_jwt_audience(),
            expiration_seconds: default_jwt_expiration_seconds(),
            supported_version: default_jwt_supported_version(),
            signing_algorithm: default_jwt_signing_algorithm(),
            private_signing_key: None,
            anonymous_id_secret: default_jwt_secret(),
            enforce_scopes: false,
        }
    }
}

fn default_database_url() -> String {
    "sqlite:oauth_dispatch.db?mode=rwc".to_string()
}

fn default_expire_public_client_days() -> i64 {
    30
}

fn default_access_token_expire_seconds() -> i64 {
    36000
}

fn default_jwt_secret() -> String {
    INSECURE_JWT_SECRET.to_string()
}

fn default_jwt_issuer() -> String {
    "http://127.0.0.1:8000/oauth2".to_string()
}

fn default_jwt_audience() -> String {
    "oauth-dispatch".to_string()
}

fn default_jwt_expiration_seconds() -> i64 {
    3600
}

fn default_jwt_supported_version() -> String {
    "1.0.0".to_string()
}

fn default_jwt_signing_algorithm() -> String {
    "RS512".to_string()
}

impl Default for Config {
    fn default() -> Self {
        // Try to load from HOCON file first, fall back to environment variables
        Self::from_hocon().unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to load HOCON config: {}. Falling back to environment variables.",
                e
            );
            Self::from_env_fallback()
        })
    }
}

impl Config {
    /// Load configuration from `application.conf` in the working directory.
    pub fn from_hocon() -> Result<Self, String> {
        Self::from_hocon_path("application.conf")
    }

    /// Load configuration from a specific HOCON file path
    pub fn from_hocon_path<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(format!("Configuration file not found: {}", path.display()));
        }

        let config: Config = HoconLoader::new()
            .load_file(path)
            .map_err(|e| format!("Failed to load HOCON file: {}", e))?
            .resolve()
            .map_err(|e| format!("Failed to parse and resolve HOCON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Structured environment loading, e.g. `OAUTH2_OAUTH__ACCESS_TOKEN_EXPIRE_SECONDS`.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("OAUTH2")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Flat `OAUTH2_*` variables, used when no HOCON file is available.
    fn from_env_fallback() -> Self {
        let defaults = OAuthConfig::default();
        let jwt_defaults = JwtConfig::default();

        Self {
            database: DatabaseConfig {
                url: env_or("OAUTH2_DATABASE_URL", default_database_url()),
                legacy_url: std::env::var("OAUTH2_LEGACY_DATABASE_URL").ok(),
            },
            oauth: OAuthConfig {
                expire_public_client_days: env_parse(
                    "OAUTH2_EXPIRE_PUBLIC_CLIENT_DAYS",
                    defaults.expire_public_client_days,
                ),
                access_token_expire_seconds: env_parse(
                    "OAUTH2_ACCESS_TOKEN_EXPIRE_SECONDS",
                    defaults.access_token_expire_seconds,
                ),
                refresh_token_expire_seconds: std::env::var("OAUTH2_REFRESH_TOKEN_EXPIRE_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok()),
            },
            jwt: JwtConfig {
                secret: std::env::var("OAUTH2_JWT_SECRET").unwrap_or_else(|_| {
                    eprintln!("WARNING: OAUTH2_JWT_SECRET not set. Using insecure default for testing only!");
                    INSECURE_JWT_SECRET.to_string()
                }),
                issuer: env_or("OAUTH2_JWT_ISSUER", jwt_defaults.issuer),
                audience: env_or("OAUTH2_JWT_AUDIENCE", jwt_defaults.audience),
                expiration_seconds: env_parse(
                    "OAUTH2_JWT_EXPIRATION_SECONDS",
                    jwt_defaults.expiration_seconds,
                ),
                supported_version: env_or(
                    "OAUTH2_JWT_SUPPORTED_VERSION",
                    jwt_defaults.supported_version,
                ),
                signing_algorithm: env_or(
                    "OAUTH2_JWT_SIGNING_ALGORITHM",
                    jwt_defaults.signing_algorithm,
                ),
                private_signing_key: std::env::var("OAUTH2_JWT_PRIVATE_SIGNING_KEY").ok(),
                anonymous_id_secret: env_or(
                    "OAUTH2_JWT_ANONYMOUS_ID_SECRET",
                    jwt_defaults.anonymous_id_secret,
                ),
                enforce_scopes: env_parse("OAUTH2_ENFORCE_JWT_SCOPES", false),
            },
        }
    }

    /// Reject values no deployment can work with.
    pub fn validate(&self) -> Result<(), String> {
        if self.oauth.access_token_expire_seconds <= 0 {
            return Err("oauth.access_token_expire_seconds must be positive".to_string());
        }
        if self.oauth.expire_public_client_days <= 0 {
            return Err("oauth.expire_public_client_days must be positive".to_string());
        }
        if matches!(self.oauth.refresh_token_expire_seconds, Some(s) if s <= 0) {
            return Err("oauth.refresh_token_expire_seconds must be positive when set".to_string());
        }

        let lifetimes = [
            ("oauth.access_token_expire_seconds", Some(self.oauth.access_token_expire_seconds)),
            ("oauth.expire_public_client_days", Some(self.oauth.public_client_expires_in())),
            ("oauth.refresh_token_expire_seconds", self.oauth.refresh_token_expire_seconds),
            ("jwt.expiration_seconds", Some(self.jwt.expiration_seconds)),
        ];
        for (name, seconds) in lifetimes {
            if matches!(seconds, Some(s) if s > MAX_LIFETIME_SECONDS) {
                return Err(format!(
                    "{} exceeds the maximum lifetime of {} seconds",
                    name, MAX_LIFETIME_SECONDS
                ));
            }
        }
        Ok(())
    }

    /// Validate configuration for production use
    pub fn validate_for_production(&self) -> Result<(), String> {
        self.validate()?;

        if self.jwt.secret == INSECURE_JWT_SECRET {
            return Err("OAUTH2_JWT_SECRET must be explicitly set for production. Generate a secure random string (minimum 32 characters).".to_string());
        }

        if self.jwt.secret.len() < 32 {
            return Err(format!(
                "OAUTH2_JWT_SECRET must be at least 32 characters long (current: {} characters)",
                self.jwt.secret.len()
            ));
        }

        if self.jwt.anonymous_id_secret == INSECURE_JWT_SECRET {
            return Err("OAUTH2_JWT_ANONYMOUS_ID_SECRET must be explicitly set for production.".to_string());
        }

        Ok(())
    }

    /// Produce a version safe to log (secrets masked).
    pub fn sanitized(&self) -> Self {
        let mut clone = self.clone();
        clone.jwt.secret = MASKED.to_string();
        clone.jwt.anonymous_id_secret = MASKED.to_string();
        if clone.jwt.private_signing_key.is_some() {
            clone.jwt.private_signing_key = Some(MASKED.to_string());
        }
        clone
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
