//! Test fixtures for the HTTP layer

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use radar_core::domain::job::Job;
use radar_core::domain::raw_job::RawJob;
use radar_core::domain::tags::flag_all;
use radar_core::dto::meta::MetaResponse;
use radar_core::dto::raw_job::NewRawJob;
use radar_pipeline::config::SchedulerConfig;
use radar_pipeline::crawl::JobFetcher;
use radar_pipeline::error::{CrawlError, ProcessError};
use radar_pipeline::processor::{Decision, JobProcessor, ProcessOutcome};
use radar_pipeline::scheduler::Scheduler;
use serde_json::json;
use sqlx::SqlitePool;

use super::{AppState, create_router};
use crate::db::memory_pool;
use crate::service::subscription_service::SubscriptionPolicy;
use crate::store::SqliteStore;

/// Returns one candidate per id, or a status error when `fail` is set
pub(crate) struct StubFetcher {
    pub fail: bool,
    pub calls: AtomicUsize,
    pub ids: Vec<String>,
}

impl Default for StubFetcher {
    fn default() -> Self {
        Self::with_ids(&["42"])
    }
}

impl StubFetcher {
    pub fn with_ids(ids: &[&str]) -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
            ids: ids.iter().map(|id| id.to_string()).collect(),
        }
    }
}

#[async_trait]
impl JobFetcher for StubFetcher {
    async fn fetch(&self) -> Result<Vec<NewRawJob>, CrawlError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CrawlError::Status {
                url: "https://eleduck.com/categories/5".to_string(),
                status: 503,
            });
        }

        Ok(self
            .ids
            .iter()
            .map(|id| NewRawJob {
                source: "eleduck".to_string(),
                external_id: id.clone(),
                title: "Remote Rust engineer".to_string(),
                summary: "Work from anywhere".to_string(),
                content: String::new(),
                url: format!("https://eleduck.com/posts/{}", id),
                tags: flag_all(["remote"]),
                raw_payload: json!({ "id": id }),
                published_at: Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap(),
            })
            .collect())
    }
}

/// Accepts every raw job as a backend job, pausing on one external id
#[derive(Default)]
pub(crate) struct AcceptAll {
    slow_on: Option<(String, Duration)>,
}

impl AcceptAll {
    pub fn slow_on(external_id: &str, delay: Duration) -> Self {
        Self {
            slow_on: Some((external_id.to_string(), delay)),
        }
    }
}

#[async_trait]
impl JobProcessor for AcceptAll {
    async fn process(&self, raw: &RawJob) -> Result<ProcessOutcome, ProcessError> {
        if let Some((id, delay)) = &self.slow_on {
            if *id == raw.external_id {
                tokio::time::sleep(*delay).await;
            }
        }

        Ok(ProcessOutcome {
            decision: Decision::Accepted(Job {
                id: raw.external_id.clone(),
                title: raw.title.clone(),
                published_at: raw.published_at,
                source: raw.source.clone(),
                url: raw.url.clone(),
                normalized_tags: flag_all(["backend"]),
                ..Default::default()
            }),
            trace: None,
        })
    }
}

/// A router served on an ephemeral local port
pub(crate) struct TestApp {
    pub base: String,
    pub pool: SqlitePool,
    pub fetcher: Arc<StubFetcher>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(StubFetcher::default()).await
    }

    pub async fn spawn_with(fetcher: StubFetcher) -> Self {
        Self::spawn_full(fetcher, AcceptAll::default()).await
    }

    pub async fn spawn_full(fetcher: StubFetcher, processor: AcceptAll) -> Self {
        let pool = memory_pool().await;
        let store = Arc::new(SqliteStore::new(pool.clone()));
        let fetcher = Arc::new(fetcher);

        let scheduler = Scheduler::new(
            fetcher.clone(),
            store.clone(),
            store,
            Arc::new(processor),
            &SchedulerConfig::default(),
            20,
        );

        let state = AppState {
            pool: pool.clone(),
            scheduler: Arc::new(scheduler),
            meta: Arc::new(MetaResponse {
                tag_candidates: vec!["Backend".to_string(), "Go".to_string()],
                channels: vec!["email".to_string()],
                ..Default::default()
            }),
            policy: Arc::new(SubscriptionPolicy::new(
                &["email".to_string()],
                &["Backend".to_string(), "Go".to_string()],
            )),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            pool,
            fetcher,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}
