//! Final job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tags::{TagMap, has_tag, is_truthy};

/// A classified, accepted job posting
///
/// `id` is the stable identity used for upsert-or-update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub url: String,
    /// Tags reported by the listing site
    pub tags: TagMap,
    pub raw_attributes: Value,
    /// Classifier tags, restricted to the configured candidates
    pub normalized_tags: TagMap,
    pub skill_tags: TagMap,
    pub employment_type: String,
    pub salary_range: String,
    pub role_category: String,
    pub language_requirement: String,
    pub score: i32,
    pub verdict: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Returns whether every truthy entry of `wanted` is a truthy normalized tag
    ///
    /// An empty (or all-falsy) `wanted` map matches every job.
    pub fn matches_tags(&self, wanted: &TagMap) -> bool {
        wanted
            .iter()
            .filter(|(_, flag)| is_truthy(flag))
            .all(|(tag, _)| has_tag(&self.normalized_tags, tag))
    }
}
