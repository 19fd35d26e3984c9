//! Error types for process resolution and execution.

use thiserror::Error;

/// Result type for process operations.
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Errors that can occur while loading or running a process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// A manifest could not be read, parsed or validated.
    #[error("Invalid process manifest: {0}")]
    InvalidManifest(String),

    /// No resolver knows this identifier.
    #[error("Process not found: {0}")]
    NotFound(String),

    /// The input blob does not fit the process's input ports.
    #[error("Invalid inputs: {0}")]
    InvalidInputs(String),

    /// The requested output is not declared by the process.
    #[error("Unknown output: {0}")]
    UnknownOutput(String),

    /// The process body failed.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// The session cannot serve the invocation.
    #[error(transparent)]
    Session(#[from] geoserve_session::SessionError),

    /// Error from the session database.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}
