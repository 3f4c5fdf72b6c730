//! Error types for Shepherd
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in Shepherd
#[derive(Debug, Error)]
pub enum ShepherdError {
    /// No loop state found for a session or loop id
    #[error("Loop not found: {0}")]
    LoopNotFound(String),

    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Session transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Evidence check could not run
    #[error("Evidence error: {0}")]
    Evidence(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for Shepherd operations
pub type Result<T> = std::result::Result<T, ShepherdError>;
