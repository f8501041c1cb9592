//! Error types for E2E testing

use earth_common::EntityKind;
use thiserror::Error;

use crate::matcher::MatchError;

/// Failure reported by the API under test.
///
/// Not retried: a single failure fails the current step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Non-success status with a JSON body; the body is kept verbatim
    #[error("API error response: {0}")]
    Structured(serde_json::Value),

    /// Non-success status without a JSON body: `"{code} {text} - {url}"`
    #[error("{0}")]
    Status(String),
}

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("Cannot build {kind} payload: parent {parent} has not been created yet")]
    MissingParent { kind: EntityKind, parent: EntityKind },

    #[error("{kind} response carries no uuid")]
    MissingUuid { kind: EntityKind },

    #[error("Current {kind} fixture has not been created yet")]
    NotCreated { kind: EntityKind },

    #[error("{kind} uuid changed on update: expected {expected}, got {actual}")]
    UuidChanged {
        kind: EntityKind,
        expected: String,
        actual: String,
    },

    #[error("Expected {expected} {kind} entities, got {actual}")]
    UnexpectedCount {
        kind: EntityKind,
        expected: usize,
        actual: usize,
    },

    #[error("Tracker group not found: {0}")]
    GroupNotFound(String),

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Timeout after {millis} ms: {step}")]
    Timeout { step: String, millis: u128 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type E2eResult<T> = Result<T, E2eError>;
