use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A platform user, as far as token dispatch is concerned.
///
/// Users are created and owned elsewhere; tokens only reference `id`. The
/// remaining fields feed the JWT claim handlers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
    /// Full name from the user's profile, when the user has one.
    #[serde(default)]
    pub name: Option<String>,
}

impl User {
    pub fn new(username: String, email: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
            name: None,
        }
    }
}
