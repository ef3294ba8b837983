//! Library exports.
//!
//! The implementation lives in the `crates/dispatch-*` workspace members; this
//! crate gathers them under one roof so applications (and the integration
//! tests) depend on a single package.

pub mod actors;
pub mod config;
pub mod jwt;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod storage;
pub mod telemetry;

pub use dispatch_service::{DestroyedTokens, DispatchError, OAuthDispatch};
