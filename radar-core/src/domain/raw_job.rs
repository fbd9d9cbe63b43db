//! Raw job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tags::TagMap;

/// An unprocessed crawl result
///
/// Raw jobs form the append-only ingestion ledger. They are keyed by
/// `(source, external_id)`; re-crawling only refreshes the descriptive fields,
/// while `status`, `reason` and `trace` change through classification alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJob {
    pub id: i64,
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub url: String,
    pub tags: TagMap,
    pub raw_payload: Value,
    pub published_at: DateTime<Utc>,
    pub status: RawJobStatus,
    pub reason: Option<String>,
    /// Prompt and completion text recorded by the classifier
    pub trace: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Processing status of a raw job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawJobStatus {
    Pending,
    Processed,
    Rejected,
}

impl RawJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawJobStatus::Pending => "pending",
            RawJobStatus::Processed => "processed",
            RawJobStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for RawJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RawJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RawJobStatus::Pending),
            "processed" => Ok(RawJobStatus::Processed),
            "rejected" => Ok(RawJobStatus::Rejected),
            other => Err(format!("unknown raw job status: {}", other)),
        }
    }
}
