//! A minimal OAuth2 token provider: just enough of RFC 6749 to mint bearer
//! pairs and serve the `refresh_token` grant.

pub mod endpoint;
pub mod generator;
pub mod request;
pub mod validator;

pub use endpoint::{TokenEndpoint, TokenEndpointRequest, TokenEndpointResponse};
pub use generator::{generate_token, BearerTokenGenerator};
pub use request::{BearerRequest, TokenForm};
pub use validator::{DynRequestValidator, RequestValidator, StorageValidator};
