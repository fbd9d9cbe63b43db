//! Notification dispatch
//!
//! Newly created jobs are announced through a [`Notifier`]. The production
//! chain is a [`SubscriptionNotifier`] that filters jobs per subscriber and
//! mails them through an [`EmailNotifier`]; [`LogNotifier`] is the
//! development fallback.

mod email;
mod log;
mod subscription;

use async_trait::async_trait;
use radar_core::domain::job::Job;

use crate::error::NotifyError;

pub use email::{EmailMessage, EmailNotifier, MailSender, SmtpMailer};
pub use log::LogNotifier;
pub use subscription::SubscriptionNotifier;

/// Announces newly created jobs
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `jobs`; an empty slice is a no-op
    async fn notify(&self, jobs: &[Job]) -> Result<(), NotifyError>;
}
