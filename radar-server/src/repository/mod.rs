//! Repository Module
//!
//! Data access layer over the SQLite pool.
//! Each repository handles database operations for a specific domain entity.

pub mod job;
pub mod raw_job;
pub mod subscription;

// Re-export for convenience
pub use job as job_repository;
pub use raw_job as raw_job_repository;
pub use subscription as subscription_repository;
