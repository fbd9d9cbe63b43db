//! Subscription domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tags::TagMap;

/// A notification preference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub email: String,
    /// Delivery channel, lower-cased (`email` is the only one delivered today)
    pub channel: String,
    /// Wanted tags; a job must carry every truthy one
    pub tags: TagMap,
    pub created_at: DateTime<Utc>,
}
