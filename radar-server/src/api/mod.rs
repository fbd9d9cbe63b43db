//! API Module
//!
//! HTTP API layer of the server.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;
pub mod meta;
pub mod refresh;
pub mod subscription;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use radar_core::dto::meta::MetaResponse;
use radar_pipeline::scheduler::Scheduler;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::service::subscription_service::SubscriptionPolicy;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub scheduler: Arc<Scheduler>,
    pub meta: Arc<MetaResponse>,
    pub policy: Arc<SubscriptionPolicy>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/api/jobs", get(job::list_jobs))
        .route("/api/refresh", post(refresh::refresh))
        // Filter metadata
        .route("/api/meta", get(meta::get_meta))
        // Subscription endpoints
        .route("/api/subscriptions", post(subscription::create_subscription))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
