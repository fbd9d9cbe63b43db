//! Job Service
//!
//! Paged listing of classified jobs.

use radar_core::domain::job::Job;
use radar_core::dto::job::JobFilter;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::repository::job_repository;

/// Service error type
#[derive(Debug)]
pub enum JobError {
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for JobError {
    fn from(err: sqlx::Error) -> Self {
        JobError::DatabaseError(err)
    }
}

/// One window of the job listing
#[derive(Debug, Clone, Serialize)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    /// Whether rows exist past this window
    pub has_more: bool,
    /// Matching rows regardless of the window
    pub total: i64,
}

/// List one window of jobs carrying every requested tag
///
/// One extra row is fetched to tell whether another window follows.
///
/// # Arguments
/// * `limit` - Window size; zero or less returns every row
/// * `offset` - Rows to skip
pub async fn list_page(
    pool: &SqlitePool,
    tags: Vec<String>,
    limit: i64,
    offset: i64,
) -> Result<JobPage, JobError> {
    let offset = offset.max(0);
    let window = if limit > 0 { limit + 1 } else { 0 };
    let filter = JobFilter { tags, limit: window, offset };

    let mut jobs = job_repository::list(pool, &filter).await?;
    let has_more = limit > 0 && jobs.len() as i64 > limit;
    if has_more {
        jobs.truncate(limit as usize);
    }

    let total = job_repository::count(pool, &filter).await?;

    tracing::debug!(
        "Listed {} jobs (offset {}, total {}, more: {})",
        jobs.len(),
        offset,
        total,
        has_more
    );

    Ok(JobPage { jobs, has_more, total })
}
