//! Token dispatch for oauth-dispatch.
//!
//! `OAuthDispatch` is the entry point: it issues access/refresh token pairs,
//! redeems refresh tokens through the token endpoint pipeline in
//! [`provider`], and revokes every token a user owns across all schemas.

pub mod actors;
pub mod api;
pub mod error;
pub mod jwt;
pub mod provider;

pub use actors::token_actor::{DestroyUserTokens, IssueToken, RefreshToken, TokenActor};
pub use api::{DestroyedTokens, OAuthDispatch};
pub use error::DispatchError;
pub use jwt::{JwtClaims, JwtIssuer};
