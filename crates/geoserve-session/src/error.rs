//! Error types for session provisioning.

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Filesystem error while preparing the workspace.
    #[error("Workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    /// Error from the session database.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A bootstrap property was injected twice.
    #[error("Property already set: {0}")]
    PropertyAlreadySet(String),

    /// The session has no datasource (its creation failed during bootstrap).
    #[error("Session {0} has no datasource")]
    DatasourceUnavailable(String),
}

/// Error returned by a [`ServiceFactory`](crate::ServiceFactory).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A property the service cannot work without is absent.
    #[error("Service '{service}' requires property '{key}'")]
    MissingDependency { service: String, key: String },

    /// The factory ran but could not build its service.
    #[error("Service '{service}' failed to start: {reason}")]
    Failed { service: String, reason: String },

    /// The factory panicked.
    #[error("Service factory '{0}' panicked: {1}")]
    Panicked(String, String),
}

/// Error returned by work submitted to a [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// The pool was cancelled before the work could start.
    #[error("Worker pool cancelled")]
    Cancelled,

    /// The work panicked.
    #[error("Worker panicked: {0}")]
    Panicked(String),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
