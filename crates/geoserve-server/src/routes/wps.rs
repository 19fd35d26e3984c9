//! WPS endpoints.

use axum::{
    Extension,
    extract::{Query, State},
};
use tracing::debug;

use crate::error::{Result, ServerError};
use crate::session::SessionBinding;
use crate::state::AppState;
use crate::wps::{
    ExecuteQuery, WpsOperationDispatcher, WpsQuery, WpsRequest, WpsRequestValidator, WpsResponse,
};

/// GET /wps - Any WPS operation, envelope in the query string.
pub async fn wps_handler(
    State(state): State<AppState>,
    Extension(binding): Extension<SessionBinding>,
    Query(query): Query<WpsQuery>,
) -> Result<WpsResponse> {
    handle(&state, binding, query).await
}

/// GET /wps/execute - Execute with the envelope implied.
pub async fn execute_handler(
    State(state): State<AppState>,
    Extension(binding): Extension<SessionBinding>,
    Query(query): Query<ExecuteQuery>,
) -> Result<WpsResponse> {
    handle(&state, binding, query.into()).await
}

async fn handle(state: &AppState, binding: SessionBinding, query: WpsQuery) -> Result<WpsResponse> {
    let request = validate(state, query).await?;

    // A presented token gets its sandbox warmed once the request is known
    // to be well formed. Execute provisions on demand either way.
    if !binding.minted && state.sessions.ensure(binding.token).await {
        debug!(token = %binding.token, "Session bootstrap scheduled");
    }

    WpsOperationDispatcher::new(state)
        .dispatch(binding.token, request)
        .await
}

/// Identifier resolution may read script files, so it runs on the blocking
/// pool.
async fn validate(state: &AppState, query: WpsQuery) -> Result<WpsRequest> {
    let registry = state.registry.clone();
    let validated =
        tokio::task::spawn_blocking(move || WpsRequestValidator::new(&registry).validate(query))
            .await
            .map_err(|e| ServerError::Internal(format!("request validation aborted: {}", e)))?;
    Ok(validated?)
}
