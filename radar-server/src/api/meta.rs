//! Metadata API Handler

use axum::{Json, extract::State};
use radar_core::dto::meta::MetaResponse;

use crate::api::AppState;

/// GET /api/meta
/// Filter candidates and subscription channels
pub async fn get_meta(State(state): State<AppState>) -> Json<MetaResponse> {
    Json(state.meta.as_ref().clone())
}
