//! Store contracts
//!
//! The pipeline persists through these traits only. The server crate
//! implements them over SQLite; tests use small in-memory stubs.
//!
//! All traits are object safe so the scheduler can hold them as
//! `Arc<dyn ...>`.

use async_trait::async_trait;
use radar_core::domain::job::Job;
use radar_core::domain::raw_job::RawJob;
use radar_core::domain::subscription::Subscription;
use radar_core::dto::job::JobFilter;
use radar_core::dto::raw_job::{NewRawJob, RawStatusUpdate};

use crate::error::StoreError;

/// Result of a raw upsert
#[derive(Debug, Clone, Default)]
pub struct RawUpsert {
    /// Number of natural keys that did not exist before
    pub created: usize,
    /// The first record of the batch for each new key
    pub new_records: Vec<NewRawJob>,
}

/// Result of a final job upsert
#[derive(Debug, Clone, Default)]
pub struct JobUpsert {
    /// Number of ids that did not exist before
    pub created: usize,
    /// The first job of the batch for each new id
    pub new_jobs: Vec<Job>,
}

/// Ingestion ledger of crawl results
#[async_trait]
pub trait RawJobStore: Send + Sync {
    /// Inserts unseen `(source, external_id)` keys as pending and refreshes
    /// the descriptive fields of existing ones
    ///
    /// Status, reason and trace of existing rows are left untouched.
    async fn upsert_raw(&self, jobs: Vec<NewRawJob>) -> Result<RawUpsert, StoreError>;

    /// Lists pending raw jobs, oldest first
    ///
    /// # Arguments
    /// * `limit` - Maximum rows to return; zero or less means 50
    async fn list_pending(&self, limit: i64) -> Result<Vec<RawJob>, StoreError>;

    /// Records the classification outcome of a raw job
    ///
    /// Returns [`StoreError::NotFound`] when no row has this id.
    async fn update_status(&self, id: i64, update: RawStatusUpdate) -> Result<(), StoreError>;
}

/// Store of classified jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts unseen ids and replaces the fields of existing ones
    async fn upsert_jobs(&self, jobs: Vec<Job>) -> Result<JobUpsert, StoreError>;

    /// Lists jobs carrying every requested tag, newest first
    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError>;

    /// Counts jobs matching the filter tags, ignoring limit and offset
    async fn count_jobs(&self, filter: &JobFilter) -> Result<i64, StoreError>;
}

/// Read access to notification preferences
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, StoreError>;
}
