pub use dispatch_core::*;
