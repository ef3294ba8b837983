//! The token endpoint pipeline the refresh facade runs through.

pub use dispatch_service::provider::*;
