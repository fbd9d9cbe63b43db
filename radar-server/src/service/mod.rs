//! Service Module
//!
//! Business logic layer of the server.
//! Services sit between the HTTP handlers and the repositories.

pub mod job;
pub mod subscription;

// Re-export for convenience
pub use job as job_service;
pub use subscription as subscription_service;
