pub use dispatch_service::jwt::{JwtClaims, JwtIssuer, ProfileClaims};
