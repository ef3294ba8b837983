//! Framework-agnostic domain types for OAuth2 token dispatch.
//!
//! Users and clients are owned by the surrounding application; this crate only
//! describes what the token facades need to know about them.

pub mod models;

pub use models::*;
