//! Earth REST API common library
//!
//! Entity shapes exchanged with the Earth REST API: continents, countries
//! and cities, plus the kind/path vocabulary the harness uses to address
//! them.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// API version prefix shared by every route
pub const API_PREFIX: &str = "/api/v1";
