use chrono::{DateTime, Utc};

use crate::identity::Role;

/// Errors surfaced by the scoring engine and evaluation workflow.
///
/// Every variant carries enough detail to render a user-facing message
/// (criterion description, configured maximum, who holds a lock).
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("{address} ({description}): value {value} not allowed, expected one of {allowed:?}")]
    Validation {
        address: String,
        description: String,
        value: f64,
        allowed: Vec<f64>,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{address}: cannot lock score {score} - {reason}")]
    InvalidScore {
        address: String,
        score: f64,
        reason: String,
    },

    #[error(
        "{address} ({description}) was already evaluated by {evaluator} at {locked_at} with {score} points; a supervisor must unlock it first"
    )]
    AlreadyLocked {
        address: String,
        description: String,
        evaluator: String,
        locked_at: DateTime<Utc>,
        score: f64,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{actor} ({role}) is not allowed to {operation}")]
    Permission {
        actor: String,
        role: Role,
        operation: String,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ScoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ScoreError::NotFound(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ScoreError::InvalidRequest(msg.into())
    }
}

pub type Result<T, E = ScoreError> = std::result::Result<T, E>;
