//! SQLite-backed pipeline stores
//!
//! Adapts the repositories to the store traits the scheduler and the
//! notifiers depend on.

use async_trait::async_trait;
use radar_core::domain::job::Job;
use radar_core::domain::raw_job::RawJob;
use radar_core::domain::subscription::Subscription;
use radar_core::dto::job::JobFilter;
use radar_core::dto::raw_job::{NewRawJob, RawStatusUpdate};
use radar_pipeline::error::StoreError;
use radar_pipeline::store::{JobStore, JobUpsert, RawJobStore, RawUpsert, SubscriptionSource};
use sqlx::SqlitePool;

use crate::repository::{job_repository, raw_job_repository, subscription_repository};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RawJobStore for SqliteStore {
    async fn upsert_raw(&self, jobs: Vec<NewRawJob>) -> Result<RawUpsert, StoreError> {
        raw_job_repository::upsert_batch(&self.pool, &jobs)
            .await
            .map_err(StoreError::database)
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<RawJob>, StoreError> {
        raw_job_repository::list_pending(&self.pool, limit)
            .await
            .map_err(StoreError::database)
    }

    async fn update_status(&self, id: i64, update: RawStatusUpdate) -> Result<(), StoreError> {
        let updated = raw_job_repository::update_status(&self.pool, id, &update)
            .await
            .map_err(StoreError::database)?;

        if !updated {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn upsert_jobs(&self, jobs: Vec<Job>) -> Result<JobUpsert, StoreError> {
        job_repository::upsert_batch(&self.pool, &jobs)
            .await
            .map_err(StoreError::database)
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        job_repository::list(&self.pool, filter)
            .await
            .map_err(StoreError::database)
    }

    async fn count_jobs(&self, filter: &JobFilter) -> Result<i64, StoreError> {
        job_repository::count(&self.pool, filter)
            .await
            .map_err(StoreError::database)
    }
}

#[async_trait]
impl SubscriptionSource for SqliteStore {
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        subscription_repository::list_all(&self.pool)
            .await
            .map_err(StoreError::database)
    }
}
