use serde::{Deserialize, Serialize};
use std::fmt;

/// RFC 6749 error payload, as produced by the token endpoint pipeline.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct OAuth2Error {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl OAuth2Error {
    pub fn new(error: &str, description: Option<&str>) -> Self {
        Self {
            error: error.to_string(),
            error_description: description.map(|s| s.to_string()),
            error_uri: None,
        }
    }

    pub fn invalid_request(description: &str) -> Self {
        Self::new("invalid_request", Some(description))
    }

    pub fn invalid_client(description: &str) -> Self {
        Self::new("invalid_client", Some(description))
    }

    pub fn invalid_grant(description: &str) -> Self {
        Self::new("invalid_grant", Some(description))
    }

    pub fn unauthorized_client(description: &str) -> Self {
        Self::new("unauthorized_client", Some(description))
    }

    pub fn unsupported_grant_type(description: &str) -> Self {
        Self::new("unsupported_grant_type", Some(description))
    }

    pub fn invalid_scope(description: &str) -> Self {
        Self::new("invalid_scope", Some(description))
    }

    pub fn server_error(description: &str) -> Self {
        Self::new("server_error", Some(description))
    }

    /// HTTP status a token endpoint answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self.error.as_str() {
            "invalid_client" => 401,
            "server_error" => 500,
            _ => 400,
        }
    }
}

impl fmt::Display for OAuth2Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{}: {}", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuth2Error {}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for OAuth2Error {
    fn from(err: sqlx::Error) -> Self {
        // Provide a stable, non-leaky mapping for common constraint violations.
        if let sqlx::Error::Database(db_err) = &err {
            let code = db_err.code().unwrap_or_default();
            let msg = db_err.message();

            // Postgres unique violation: 23505
            // SQLite reports 2067/1555 or only the message, depending on the build.
            let is_unique = code == "23505"
                || code == "2067"
                || code == "1555"
                || msg.contains("UNIQUE constraint failed")
                || msg.contains("duplicate key");

            if is_unique {
                return Self::invalid_request("duplicate key");
            }
        }

        Self::server_error(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code_and_description() {
        let err = OAuth2Error::invalid_grant("Refresh token not found");
        assert_eq!(err.to_string(), "invalid_grant: Refresh token not found");
        assert_eq!(OAuth2Error::new("access_denied", None).to_string(), "access_denied");
    }

    #[test]
    fn status_codes_follow_token_endpoint_conventions() {
        assert_eq!(OAuth2Error::invalid_client("x").status_code(), 401);
        assert_eq!(OAuth2Error::invalid_grant("x").status_code(), 400);
        assert_eq!(OAuth2Error::server_error("x").status_code(), 500);
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let json = serde_json::to_value(OAuth2Error::new("invalid_grant", None)).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "invalid_grant" }));
    }
}
