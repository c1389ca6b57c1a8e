//! Error types for splitfire-core
//!
//! An unresolvable expense annotation is not represented here: skipping an
//! expense for manual handling is a routine outcome, reported through the run
//! report rather than the error channel.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Validation error
    ValidationError,
    /// Account not found in the ledger
    UnknownAccount,
    /// Remote write rejected
    RemoteWriteError,
    /// Network or protocol failure
    TransportError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::UnknownAccount => write!(f, "UNKNOWN_ACCOUNT"),
            ErrorCode::RemoteWriteError => write!(f, "REMOTE_WRITE_ERROR"),
            ErrorCode::TransportError => write!(f, "TRANSPORT_ERROR"),
        }
    }
}

/// Main error type for splitfire-core
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Unknown account: {name}")]
    UnknownAccount { name: String },

    #[error("Remote write rejected during {operation}: {message}")]
    RemoteWrite { operation: String, message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },
}

impl SyncError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            SyncError::Validation { .. } => ErrorCode::ValidationError,
            SyncError::UnknownAccount { .. } => ErrorCode::UnknownAccount,
            SyncError::RemoteWrite { .. } => ErrorCode::RemoteWriteError,
            SyncError::Transport { .. } => ErrorCode::TransportError,
        }
    }
}

/// Result type with SyncError
pub type SyncResult<T> = Result<T, SyncError>;

// ==================== Tests ====================
