//! Routing of validated requests to their operation.

use geoserve_process::{ExecutionMode, ExecutionRequest, JobStatus, ResponseFormat};
use geoserve_session::SessionToken;
use tracing::{debug, info};

use crate::error::{Result, ServerError, WpsError};
use crate::state::AppState;
use crate::wps::response::{Capabilities, ProcessOfferings, StatusInfo, WpsResponse};
use crate::wps::validator::WpsRequest;

/// Executes validated WPS requests for one session.
pub struct WpsOperationDispatcher<'a> {
    state: &'a AppState,
}

impl<'a> WpsOperationDispatcher<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn dispatch(
        &self,
        token: SessionToken,
        request: WpsRequest,
    ) -> Result<WpsResponse> {
        match request {
            WpsRequest::GetCapabilities => {
                // Script resolvers list their directories.
                let registry = self.state.registry.clone();
                let offerings = tokio::task::spawn_blocking(move || registry.offerings())
                    .await
                    .map_err(|e| ServerError::Internal(format!("catalog listing aborted: {}", e)))?;
                debug!(processes = offerings.len(), "GetCapabilities");
                Ok(WpsResponse::Capabilities(Capabilities::new(&offerings)))
            }
            WpsRequest::DescribeProcess { process } => {
                debug!(identifier = %process.identifier(), "DescribeProcess");
                Ok(WpsResponse::ProcessOfferings(ProcessOfferings::new(
                    process.descriptor(),
                )))
            }
            WpsRequest::Execute {
                process,
                response_format,
                mode,
                inputs,
                output,
            } => {
                let response_format: ResponseFormat = response_format
                    .as_deref()
                    .unwrap_or_default()
                    .parse()
                    .map_err(|_| WpsError::WrongResponseFormat)?;
                let mode: ExecutionMode = mode
                    .as_deref()
                    .unwrap_or_default()
                    .parse()
                    .map_err(|_| WpsError::WrongMode)?;

                let request = ExecutionRequest {
                    identifier: process.identifier().to_string(),
                    response_format,
                    mode,
                    inputs,
                    output,
                };

                let session = self.state.sessions.session(token).await;
                let execution = self.state.engine.execute(session, process, request).await;
                let job = execution.job;

                info!(
                    job_id = %job.id(),
                    token = %token,
                    status = %job.status(),
                    "Execute"
                );

                if execution.settled && job.status() == JobStatus::Failed {
                    return Err(WpsError::ExecutionFailed {
                        job_id: job.id().to_string(),
                    }
                    .into());
                }
                Ok(WpsResponse::StatusInfo(StatusInfo::of(&job)))
            }
        }
    }
}
