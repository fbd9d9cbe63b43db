//! Refresh API Handler
//!
//! Manual trigger of one pipeline cycle.

use axum::{Json, extract::State};
use radar_core::dto::job::RefreshResponse;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// POST /api/refresh
/// Run one cycle now and report how many jobs it created
///
/// A trigger that overlaps a running cycle reports zero. The cycle runs on
/// its own task and finishes even if the client goes away.
pub async fn refresh(State(state): State<AppState>) -> ApiResult<Json<RefreshResponse>> {
    tracing::info!("Manual refresh requested");

    let scheduler = state.scheduler.clone();
    let created = tokio::spawn(async move { scheduler.run_once().await })
        .await
        .map_err(|e| ApiError::InternalError(format!("refresh task failed: {}", e)))?
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(RefreshResponse { created }))
}
