//! Job API Handlers
//!
//! Paged listing of classified jobs.

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::job_service;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

// =============================================================================
// Job Endpoints
// =============================================================================

/// GET /api/jobs
/// List classified jobs, newest first
///
/// Query parameters:
/// - `limit` (optional): Page size, default 20, at most 100
/// - `page` (optional): 1-based page number, default 1
/// - `offset` (optional): Rows to skip; takes precedence over `page`
/// - `tag` / `tags` (optional, repeatable): Comma-separated required tags
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<impl IntoResponse> {
    let query = JobsQuery::from_pairs(&params);
    tracing::debug!(
        "Listing jobs: limit={} offset={} tags={:?}",
        query.limit,
        query.offset,
        query.tags
    );

    let page =
        job_service::list_page(&state.pool, query.tags, query.limit, query.offset).await?;

    let headers = [
        ("X-Page", query.page.to_string()),
        ("X-Limit", query.limit.to_string()),
        ("X-Offset", query.offset.to_string()),
        ("X-Has-More", page.has_more.to_string()),
        ("X-Total", page.total.to_string()),
    ];

    Ok((headers, Json(page.jobs)))
}

// =============================================================================
// Request Types
// =============================================================================

/// Listing window and tag filter parsed from the raw query pairs
#[derive(Debug, PartialEq, Eq)]
struct JobsQuery {
    limit: i64,
    page: i64,
    offset: i64,
    tags: Vec<String>,
}

impl JobsQuery {
    /// Unparsable or out-of-range numbers fall back to their defaults
    fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut limit = DEFAULT_LIMIT;
        let mut page = 1;
        let mut offset = None;
        let mut tags: Vec<String> = Vec::new();

        for (key, value) in pairs {
            match key.as_str() {
                "limit" => {
                    if let Some(n) = positive(value) {
                        limit = n.min(MAX_LIMIT);
                    }
                }
                "page" => {
                    if let Some(n) = positive(value) {
                        page = n;
                    }
                }
                "offset" => {
                    if let Ok(n) = value.trim().parse::<i64>() {
                        if n >= 0 {
                            offset = Some(n);
                        }
                    }
                }
                "tag" | "tags" => {
                    for tag in value.split(',').map(str::trim) {
                        if !tag.is_empty() && !tags.iter().any(|seen| seen == tag) {
                            tags.push(tag.to_string());
                        }
                    }
                }
                _ => {}
            }
        }

        let offset = match offset {
            Some(offset) => {
                page = offset / limit + 1;
                offset
            }
            None => (page - 1).saturating_mul(limit),
        };

        Self {
            limit,
            page,
            offset,
            tags,
        }
    }
}

fn positive(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok().filter(|n| *n > 0)
}
