//! Subscription DTOs

use serde::{Deserialize, Serialize};

use crate::domain::tags::TagMap;

/// Subscription request as submitted by a user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub email: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A validated subscription ready to be stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
    pub email: String,
    pub channel: String,
    pub tags: TagMap,
}
