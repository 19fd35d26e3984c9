//! Job polling endpoint.

use axum::{
    Json,
    extract::{Path, State},
};
use geoserve_process::JobId;

use crate::error::ServerError;
use crate::state::AppState;
use crate::wps::StatusInfo;

/// GET /jobs/{id} - Current status of a job.
pub async fn get_job_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusInfo>, ServerError> {
    let job_id: JobId = id
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("Invalid job id: {}", id)))?;

    let job = state
        .engine
        .jobs()
        .get(job_id)
        .ok_or_else(|| ServerError::NotFound(format!("Job {} not found", id)))?;

    Ok(Json(StatusInfo::of(&job)))
}
