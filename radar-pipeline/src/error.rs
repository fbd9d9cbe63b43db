//! Error types for the job pipeline
//!
//! Each stage has its own error enum; [`CycleError`] wraps them for the
//! scheduler. Rejections are normal outcomes and never appear here.

use std::time::Duration;

use radar_client::ClientError;
use thiserror::Error;

/// Errors that abort a crawl
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("__NEXT_DATA__ script not found in {url}")]
    MissingScript { url: String },

    #[error("invalid page data in {url}: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("post list not found in page data of {url}")]
    MissingPostList { url: String },
}

/// Errors that abort classification of a raw job
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("completion request failed: {0}")]
    Completion(#[from] ClientError),

    #[error("failed to parse completion answer: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors reported by store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("raw job {0} not found")]
    NotFound(i64),

    #[error("database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a backend specific error
    pub fn database(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Database(err.into())
    }
}

/// Errors raised while delivering notifications
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to load subscriptions: {0}")]
    Subscriptions(#[from] StoreError),

    #[error("invalid email message: {0}")]
    Message(String),

    #[error("failed to send email: {0}")]
    Transport(String),
}

/// Errors surfaced by a scheduler cycle
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch jobs: {0}")]
    Crawl(#[from] CrawlError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("process raw job {id}: {source}")]
    Process {
        id: i64,
        #[source]
        source: ProcessError,
    },

    #[error("notify: {0}")]
    Notify(#[from] NotifyError),

    #[error("cycle exceeded its {0:?} deadline")]
    Timeout(Duration),

    #[error("no matching cron time within one year")]
    NoSchedule,
}
