//! Logging notifier

use async_trait::async_trait;
use radar_core::domain::job::Job;
use tracing::info;

use super::Notifier;
use crate::error::NotifyError;

/// Writes new jobs to the log instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, jobs: &[Job]) -> Result<(), NotifyError> {
        if jobs.is_empty() {
            return Ok(());
        }

        info!("{} new job(s)", jobs.len());
        for job in jobs {
            info!("New job: {} ({}) {}", job.title, job.source, job.url);
        }

        Ok(())
    }
}
