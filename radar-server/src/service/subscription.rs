//! Subscription Service
//!
//! Validation and persistence of notification preferences.

use std::collections::{HashMap, HashSet};

use lettre::message::Mailbox;
use radar_core::domain::subscription::Subscription;
use radar_core::domain::tags::TagMap;
use radar_core::dto::subscription::{NewSubscription, SubscriptionRequest};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::repository::subscription_repository;

const DEFAULT_CHANNEL: &str = "email";

/// Service error type
#[derive(Debug)]
pub enum SubscriptionError {
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for SubscriptionError {
    fn from(err: sqlx::Error) -> Self {
        SubscriptionError::DatabaseError(err)
    }
}

/// Accepted channels and tag spellings
#[derive(Debug, Clone)]
pub struct SubscriptionPolicy {
    channels: HashSet<String>,
    /// Lower-cased tag to canonical spelling
    tags: HashMap<String, String>,
}

impl SubscriptionPolicy {
    /// Builds a policy from configured channels and tag candidates
    ///
    /// Channels are lower-cased and `email` is allowed when none remain.
    /// Without tag candidates any tag is accepted.
    pub fn new(allowed_channels: &[String], tag_candidates: &[String]) -> Self {
        let mut channels: HashSet<String> = allowed_channels
            .iter()
            .map(|channel| channel.trim().to_lowercase())
            .filter(|channel| !channel.is_empty())
            .collect();
        if channels.is_empty() {
            channels.insert(DEFAULT_CHANNEL.to_string());
        }

        let tags = tag_candidates
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(|tag| (tag.to_lowercase(), tag.to_string()))
            .collect();

        Self { channels, tags }
    }

    /// Allowed channels, sorted
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.channels.iter().cloned().collect();
        channels.sort();
        channels
    }

    /// Checks a request and normalizes it for storage
    pub fn validate(&self, req: SubscriptionRequest) -> Result<NewSubscription, SubscriptionError> {
        let email = req.email.trim();
        if email.is_empty() {
            return Err(SubscriptionError::ValidationError("email required".to_string()));
        }
        if let Err(err) = email.parse::<Mailbox>() {
            return Err(SubscriptionError::ValidationError(format!("invalid email: {}", err)));
        }

        let mut channel = req.channel.trim().to_lowercase();
        if channel.is_empty() {
            channel = DEFAULT_CHANNEL.to_string();
        }
        if !self.channels.contains(&channel) {
            return Err(SubscriptionError::ValidationError(format!(
                "unsupported channel {}",
                channel
            )));
        }

        let mut tags = TagMap::new();
        for tag in &req.tags {
            let trimmed = tag.trim();
            if trimmed.is_empty() {
                continue;
            }
            let canonical = match self.tags.get(&trimmed.to_lowercase()) {
                Some(canonical) => canonical.clone(),
                None if self.tags.is_empty() => trimmed.to_string(),
                None => {
                    return Err(SubscriptionError::ValidationError(format!(
                        "unknown tag {}",
                        tag
                    )));
                }
            };
            tags.insert(canonical, Value::Bool(true));
        }

        Ok(NewSubscription {
            email: email.to_string(),
            channel,
            tags,
        })
    }
}

/// Validate and store a subscription
pub async fn create(
    pool: &SqlitePool,
    policy: &SubscriptionPolicy,
    req: SubscriptionRequest,
) -> Result<Subscription, SubscriptionError> {
    let new_subscription = policy.validate(req)?;
    let subscription = subscription_repository::create(pool, new_subscription).await?;

    tracing::info!(
        "Subscription {} created for {} on {}",
        subscription.id,
        subscription.email,
        subscription.channel
    );

    Ok(subscription)
}
