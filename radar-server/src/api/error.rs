//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::{job_service, subscription_service};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    DatabaseError(sqlx::Error),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<job_service::JobError> for ApiError {
    fn from(err: job_service::JobError) -> Self {
        match err {
            job_service::JobError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<subscription_service::SubscriptionError> for ApiError {
    fn from(err: subscription_service::SubscriptionError) -> Self {
        match err {
            subscription_service::SubscriptionError::ValidationError(msg) => {
                ApiError::BadRequest(msg)
            }
            subscription_service::SubscriptionError::DatabaseError(err) => {
                ApiError::DatabaseError(err)
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
