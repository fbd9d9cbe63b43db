//! Subscription-aware notifier

use std::sync::Arc;

use async_trait::async_trait;
use radar_core::domain::job::Job;
use tracing::debug;

use super::{EmailNotifier, Notifier};
use crate::error::NotifyError;
use crate::store::SubscriptionSource;

/// Sends each subscriber the new jobs carrying all of their tags
///
/// With no subscriptions at all, the fallback notifier (if any) receives
/// every job. Subscriptions on channels other than email are skipped.
pub struct SubscriptionNotifier {
    subscriptions: Arc<dyn SubscriptionSource>,
    email: EmailNotifier,
    fallback: Option<Arc<dyn Notifier>>,
}

impl SubscriptionNotifier {
    pub fn new(subscriptions: Arc<dyn SubscriptionSource>, email: EmailNotifier) -> Self {
        Self {
            subscriptions,
            email,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn Notifier>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

fn delivers_by_email(channel: &str) -> bool {
    let channel = channel.trim();
    channel.is_empty() || channel.eq_ignore_ascii_case("email")
}

#[async_trait]
impl Notifier for SubscriptionNotifier {
    async fn notify(&self, jobs: &[Job]) -> Result<(), NotifyError> {
        if jobs.is_empty() {
            return Ok(());
        }

        let subscriptions = self.subscriptions.list_subscriptions().await?;

        if subscriptions.is_empty() {
            return match &self.fallback {
                Some(fallback) => fallback.notify(jobs).await,
                None => Ok(()),
            };
        }

        for subscription in subscriptions {
            let matches: Vec<Job> = jobs
                .iter()
                .filter(|job| job.matches_tags(&subscription.tags))
                .cloned()
                .collect();

            if matches.is_empty() {
                continue;
            }

            if !delivers_by_email(&subscription.channel) {
                debug!(
                    "Skipping subscription {} on unsupported channel {}",
                    subscription.id, subscription.channel
                );
                continue;
            }

            self.email
                .for_recipient(&subscription.email)
                .notify(&matches)
                .await?;
        }

        Ok(())
    }
}
