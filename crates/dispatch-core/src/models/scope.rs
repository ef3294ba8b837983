use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of scopes a dispatched token can carry.
///
/// Each scope has a stable integer key (what callers pass to the issuance
/// facade) and a canonical name (what ends up in the token record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scope {
    Default,
    Read,
    Write,
    ReadWrite,
    OpenId,
    Profile,
    Email,
}

impl Scope {
    pub const ALL: [Scope; 7] = [
        Scope::Default,
        Scope::Read,
        Scope::Write,
        Scope::ReadWrite,
        Scope::OpenId,
        Scope::Profile,
        Scope::Email,
    ];

    pub const DEFAULT_KEY: u32 = 0;

    pub fn key(self) -> u32 {
        match self {
            Scope::Default => 0,
            Scope::Read => 2,
            Scope::Write => 4,
            Scope::ReadWrite => 6,
            Scope::OpenId => 8,
            Scope::Profile => 16,
            Scope::Email => 32,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Default => "default",
            Scope::Read => "read",
            Scope::Write => "write",
            Scope::ReadWrite => "read+write",
            Scope::OpenId => "openid",
            Scope::Profile => "profile",
            Scope::Email => "email",
        }
    }

    /// Resolve a scope key. Unknown keys are an error, never a default.
    pub fn from_key(key: u32) -> Result<Self, ScopeLookupError> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.key() == key)
            .ok_or(ScopeLookupError::UnknownKey(key))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ScopeLookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str() == s)
            .ok_or_else(|| ScopeLookupError::UnknownName(s.to_string()))
    }
}

impl TryFrom<String> for Scope {
    type Error = ScopeLookupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeLookupError {
    UnknownKey(u32),
    UnknownName(String),
}

impl fmt::Display for ScopeLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeLookupError::UnknownKey(key) => write!(f, "unknown scope key: {key}"),
            ScopeLookupError::UnknownName(name) => write!(f, "unknown scope name: {name}"),
        }
    }
}

impl std::error::Error for ScopeLookupError {}

/// Join scopes into the space-separated form used in token records.
pub fn join_scopes(scopes: &[Scope]) -> String {
    scopes
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Parse a space-separated scope string, failing on the first unknown name.
pub fn parse_scopes(scope: &str) -> Result<Vec<Scope>, ScopeLookupError> {
    scope.split_whitespace().map(str::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_key_resolves_to_default_scope() {
        let scope = Scope::from_key(Scope::DEFAULT_KEY).unwrap();
        assert_eq!(scope, Scope::Default);
        assert_eq!(scope.as_str(), "default");
    }

    #[test]
    fn every_scope_round_trips_through_its_key_and_name() {
        for scope in Scope::ALL {
            assert_eq!(Scope::from_key(scope.key()), Ok(scope));
            assert_eq!(scope.as_str().parse::<Scope>(), Ok(scope));
        }
    }

    #[test]
    fn unknown_key_fails_closed() {
        assert_eq!(Scope::from_key(1), Err(ScopeLookupError::UnknownKey(1)));
        assert_eq!(
            "admin".parse::<Scope>(),
            Err(ScopeLookupError::UnknownName("admin".to_string()))
        );
    }

    #[test]
    fn scope_strings_join_and_parse() {
        let scopes = vec![Scope::Email, Scope::Profile];
        assert_eq!(join_scopes(&scopes), "email profile");
        assert_eq!(parse_scopes("email  profile").unwrap(), scopes);
        assert!(parse_scopes("email nope").is_err());
    }

    #[test]
    fn scope_serializes_as_its_name() {
        let json = serde_json::to_string(&Scope::ReadWrite).unwrap();
        assert_eq!(json, "\"read+write\"");
        let back: Scope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Scope::ReadWrite);
    }
}
