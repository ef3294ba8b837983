use std::fmt;

use dispatch_core::{OAuth2Error, ScopeLookupError};

/// Everything the dispatch facades can fail with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The requested scope key (or a stored scope name) is not in the table.
    Scope(ScopeLookupError),
    /// The token pipeline rejected the request; carries its error unchanged.
    Protocol(OAuth2Error),
    /// A token store failed.
    Storage(OAuth2Error),
    /// The pipeline answered 200 with a body that is not a token record.
    MalformedResponse(String),
    Jwt(String),
    /// The configuration cannot be served.
    Config(String),
}

impl DispatchError {
    /// The OAuth2 error behind this failure, when there is one.
    pub fn oauth_error(&self) -> Option<&OAuth2Error> {
        match self {
            DispatchError::Protocol(err) | DispatchError::Storage(err) => Some(err),
            _ => None,
        }
    }

    /// Short label used for metrics and span fields.
    pub fn code(&self) -> &str {
        match self {
            DispatchError::Scope(_) => "invalid_scope",
            DispatchError::Protocol(err) | DispatchError::Storage(err) => &err.error,
            DispatchError::MalformedResponse(_) => "malformed_response",
            DispatchError::Jwt(_) => "jwt_error",
            DispatchError::Config(_) => "invalid_config",
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Scope(err) => write!(f, "{}", err),
            DispatchError::Protocol(err) => write!(f, "token request rejected: {}", err),
            DispatchError::Storage(err) => write!(f, "token storage failed: {}", err),
            DispatchError::MalformedResponse(msg) => {
                write!(f, "malformed token response: {}", msg)
            }
            DispatchError::Jwt(msg) => write!(f, "jwt encoding failed: {}", msg),
            DispatchError::Config(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Scope(err) => Some(err),
            DispatchError::Protocol(err) | DispatchError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ScopeLookupError> for DispatchError {
    fn from(err: ScopeLookupError) -> Self {
        DispatchError::Scope(err)
    }
}

impl From<jsonwebtoken::errors::Error> for DispatchError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        DispatchError::Jwt(err.to_string())
    }
}
