pub use dispatch_config::{Config, DatabaseConfig, JwtConfig, OAuthConfig, SECONDS_PER_DAY};
