//! Error types for the entity model

use thiserror::Error;

/// Result type alias using the entity model Error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown continent type code: {0}")]
    UnknownContinentType(u8),

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),
}
