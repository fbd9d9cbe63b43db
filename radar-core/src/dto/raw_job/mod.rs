//! Raw job DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::raw_job::RawJobStatus;
use crate::domain::tags::TagMap;

/// A crawl candidate ready to be upserted into the raw job store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRawJob {
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub url: String,
    pub tags: TagMap,
    /// Original listing payload, kept for audit and reprocessing
    pub raw_payload: Value,
    pub published_at: DateTime<Utc>,
}

/// Status transition applied after classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStatusUpdate {
    pub status: RawJobStatus,
    pub reason: Option<String>,
    pub trace: Option<Value>,
}

impl RawStatusUpdate {
    pub fn processed(trace: Option<Value>) -> Self {
        Self {
            status: RawJobStatus::Processed,
            reason: None,
            trace,
        }
    }

    pub fn rejected(reason: impl Into<String>, trace: Option<Value>) -> Self {
        Self {
            status: RawJobStatus::Rejected,
            reason: Some(reason.into()),
            trace,
        }
    }
}
