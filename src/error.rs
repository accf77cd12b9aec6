//! Error types for Synheart Swim

use thiserror::Error;

/// Malformed session shape, raised at construction time.
///
/// A session that fails here never enters the pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    #[error("Session id must not be empty")]
    EmptySessionId,

    #[error("Negative value for {field}: {value}")]
    NegativeValue { field: String, value: f64 },

    #[error("Non-finite value for {field}")]
    NonFiniteValue { field: String },

    #[error("Duplicate interval index: {0}")]
    DuplicateIntervalIndex(u32),

    #[error("Interval indices not contiguous from zero: expected {expected}, found {found}")]
    NonContiguousIntervals { expected: u32, found: u32 },

    #[error(
        "Interval distances sum to {interval_sum} m but session total is {total} m (tolerance {tolerance} m)"
    )]
    DistanceSumMismatch {
        interval_sum: f64,
        total: f64,
        tolerance: f64,
    },
}

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Session id {0} appears more than once in the batch")]
    DuplicateSessionId(String),

    #[error("Session {session_id} is unusable: {issues}")]
    UnusableSession { session_id: String, issues: String },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse session records: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
