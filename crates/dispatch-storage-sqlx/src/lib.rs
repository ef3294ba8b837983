//! SQLx adapters for both token schemas.
//!
//! `SqlxStorage` persists the current schema (clients, access and refresh
//! tokens). `LegacySqlxStore` owns the legacy token tables, which are only ever
//! cleaned up by user-wide revocation.

mod current;
mod legacy;
mod pool;

pub use current::SqlxStorage;
pub use legacy::LegacySqlxStore;
