//! Error types for taskdeck
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown record)
//! - 3: Rejected by the store (schedule conflict, duplicate id)
//! - 4: Operation failed (I/O, snapshot parse, serialization)

use thiserror::Error;

use crate::record::{Record, RecordId, RecordKind};
use crate::snapshot::SnapshotError;

/// Exit codes for the taskdeck CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const REJECTED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskdeck operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{kind} not found: {id}")]
    RecordNotFound { kind: RecordKind, id: RecordId },

    // Store rejections (exit code 3)
    #[error("Time slot already taken by {conflicting}")]
    IntervalConflict { conflicting: Box<Record> },

    #[error("Record id already in use: {0}")]
    DuplicateId(RecordId),

    // Operation failures (exit code 4)
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_) | Error::InvalidConfig(_) | Error::RecordNotFound { .. } => {
                exit_codes::USER_ERROR
            }

            Error::IntervalConflict { .. } | Error::DuplicateId(_) => exit_codes::REJECTED,

            Error::Snapshot(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output, when the error carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::IntervalConflict { conflicting } => {
                serde_json::to_value(conflicting.as_ref()).ok()
            }
            Error::RecordNotFound { kind, id } => Some(serde_json::json!({
                "kind": kind,
                "id": id,
            })),
            _ => None,
        }
    }
}

/// Result type alias for taskdeck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
