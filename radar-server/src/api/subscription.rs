//! Subscription API Handlers

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use radar_core::dto::subscription::SubscriptionRequest;
use serde_json::{Value, json};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::subscription_service;

/// POST /api/subscriptions
/// Register a notification preference
pub async fn create_subscription(
    State(state): State<AppState>,
    payload: Result<Json<SubscriptionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!("Rejected subscription payload: {}", e);
        ApiError::BadRequest("invalid payload".to_string())
    })?;

    subscription_service::create(&state.pool, &state.policy, req).await?;

    Ok((StatusCode::CREATED, Json(json!({ "status": "ok" }))))
}
