pub mod client;
pub mod error;
pub mod legacy;
pub mod scope;
pub mod token;
pub mod user;

pub use client::*;
pub use error::*;
pub use legacy::*;
pub use scope::*;
pub use token::*;
pub use user::*;
