//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified WPS protocol and execution errors.
///
/// Messages are fixed: clients match on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WpsError {
    #[error("You need to enter a service to do queries, it should be wps here.")]
    MissingService,

    #[error("The service was not properly written, it should be wps here.")]
    WrongService,

    #[error("You need to enter the version of wps to get the corresponding xml file.")]
    MissingVersion,

    #[error("Please enter a good version of wps, it should be 2.0.0.")]
    WrongVersion,

    #[error("You need to enter the request to get the corresponding xml file.")]
    MissingOperation,

    #[error("This request does not exist, please try something else like GetCapabilities.")]
    UnknownOperation,

    #[error("GetCapabilities does not need identifier, so don't write it.")]
    GetCapabilitiesNoIdentifierAllowed,

    #[error("An Identifier is missing.")]
    MissingIdentifier,

    #[error("No process has this identifier, please be more accurate.")]
    UnresolvedProcess,

    #[error("The desired response format is incorrect, please set it to document or raw.")]
    WrongResponseFormat,

    #[error("The desired execution method is incorrect, please set it to auto, sync or async.")]
    WrongMode,

    /// The job reached `Failed` while the caller waited. The diagnostic
    /// stays on the job.
    #[error("The process execution failed.")]
    ExecutionFailed { job_id: String },
}

impl WpsError {
    /// Error class name used as the response `code`.
    pub fn code(&self) -> &'static str {
        match self {
            WpsError::MissingService => "MissingService",
            WpsError::WrongService => "WrongService",
            WpsError::MissingVersion => "MissingVersion",
            WpsError::WrongVersion => "WrongVersion",
            WpsError::MissingOperation => "MissingOperation",
            WpsError::UnknownOperation => "UnknownOperation",
            WpsError::GetCapabilitiesNoIdentifierAllowed => "GetCapabilitiesNoIdentifierAllowed",
            WpsError::MissingIdentifier => "MissingIdentifier",
            WpsError::UnresolvedProcess => "UnresolvedProcess",
            WpsError::WrongResponseFormat => "WrongResponseFormat",
            WpsError::WrongMode => "WrongMode",
            WpsError::ExecutionFailed { .. } => "ExecutionFailed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WpsError::ExecutionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Server error type for everything outside the WPS operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// A classified WPS error, rendered with its own code and status.
    #[error(transparent)]
    Wps(#[from] WpsError),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Job that failed, for execution errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl IntoResponse for WpsError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        let job_id = match &self {
            WpsError::ExecutionFailed { job_id } => {
                tracing::error!(status = %status, code, job_id = %job_id, "Execution error");
                Some(job_id.clone())
            }
            _ => {
                tracing::warn!(status = %status, code, error = %message, "WPS request rejected");
                None
            }
        };

        let body = ErrorResponse {
            code: code.to_string(),
            message,
            job_id,
        };

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if let ServerError::Wps(e) = self {
            return e.into_response();
        }

        let (status, code) = match &self {
            ServerError::Wps(e) => (e.status(), e.code()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let message = self.to_string();

        match &self {
            ServerError::Internal(_) => {
                tracing::error!(status = %status, code, error = %message, "Server error");
            }
            _ => {
                tracing::warn!(status = %status, code, error = %message, "Client error");
            }
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
            job_id: None,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_errors_are_bad_requests() {
        for err in [
            WpsError::MissingService,
            WpsError::WrongVersion,
            WpsError::UnresolvedProcess,
            WpsError::WrongMode,
        ] {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
        let failed = WpsError::ExecutionFailed {
            job_id: "j".into(),
        };
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = WpsError::GetCapabilitiesNoIdentifierAllowed.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.code, "GetCapabilitiesNoIdentifierAllowed");
        assert_eq!(
            parsed.message,
            "GetCapabilities does not need identifier, so don't write it."
        );
        assert!(parsed.job_id.is_none());
    }

    #[tokio::test]
    async fn test_execution_failure_carries_job_id() {
        let response = WpsError::ExecutionFailed {
            job_id: "abc".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.job_id.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_wrapped_wps_error_keeps_its_shape() {
        let response = ServerError::from(WpsError::WrongMode).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.code, "WrongMode");
        assert_eq!(
            parsed.message,
            "The desired execution method is incorrect, please set it to auto, sync or async."
        );
    }
}
