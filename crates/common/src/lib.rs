//! Cirrus Common Library
//!
//! Remote API types, the error taxonomy, and the API client boundary
//! shared by the Cirrus provider.

pub mod api;
pub mod error;
pub mod types;

pub use api::CloudApi;
pub use error::{Error, Result};
pub use types::*;

/// Cirrus version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
