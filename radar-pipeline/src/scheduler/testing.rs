//! Stub collaborators for scheduler tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use radar_core::domain::job::Job;
use radar_core::domain::raw_job::{RawJob, RawJobStatus};
use radar_core::domain::tags::flag_all;
use radar_core::dto::job::JobFilter;
use radar_core::dto::raw_job::{NewRawJob, RawStatusUpdate};
use serde_json::json;
use tokio::sync::Notify;

use crate::crawl::JobFetcher;
use crate::error::{CrawlError, NotifyError, ProcessError, StoreError};
use crate::notify::Notifier;
use crate::processor::{Decision, JobProcessor, ProcessOutcome};
use crate::store::{JobStore, JobUpsert, RawJobStore, RawUpsert};

pub fn candidate(id: &str, title: &str) -> NewRawJob {
    NewRawJob {
        source: "eleduck".to_string(),
        external_id: id.to_string(),
        title: title.to_string(),
        summary: format!("{} summary", title),
        content: String::new(),
        url: format!("https://eleduck.com/posts/{}", id),
        tags: flag_all(["远程"]),
        raw_payload: json!({ "id": id }),
        published_at: Utc::now(),
    }
}

// =============================================================================
// Fetcher
// =============================================================================

#[derive(Default)]
pub struct StubFetcher {
    pub candidates: Vec<NewRawJob>,
    pub calls: AtomicUsize,
    pub fail: bool,
    /// Delay applied to the first call only
    pub first_delay: Option<Duration>,
    /// When set, every call waits for a permit
    pub gate: Option<Arc<Notify>>,
    pub started: Arc<Notify>,
}

impl StubFetcher {
    pub fn returning(candidates: Vec<NewRawJob>) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobFetcher for StubFetcher {
    async fn fetch(&self) -> Result<Vec<NewRawJob>, CrawlError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if call == 0 {
            if let Some(delay) = self.first_delay {
                tokio::time::sleep(delay).await;
            }
        }
        if self.fail {
            return Err(CrawlError::MissingScript {
                url: "http://stub/jobs".to_string(),
            });
        }
        Ok(self.candidates.clone())
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Default)]
struct MemoryState {
    raw: Vec<RawJob>,
    jobs: HashMap<String, Job>,
}

/// In-memory raw and final store
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    pub raw_upserts: AtomicUsize,
    pub job_upserts: AtomicUsize,
}

impl MemoryStore {
    pub fn raw_jobs(&self) -> Vec<RawJob> {
        self.state.lock().unwrap().raw.clone()
    }

    pub fn job_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().unwrap().jobs.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl RawJobStore for MemoryStore {
    async fn upsert_raw(&self, jobs: Vec<NewRawJob>) -> Result<RawUpsert, StoreError> {
        self.raw_upserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let mut result = RawUpsert::default();

        for job in jobs {
            let existing = state
                .raw
                .iter()
                .position(|raw| raw.source == job.source && raw.external_id == job.external_id);
            match existing {
                Some(index) => {
                    let raw = &mut state.raw[index];
                    raw.title = job.title.clone();
                    raw.updated_at = Utc::now();
                }
                None => {
                    let now = Utc::now();
                    let id = state.raw.len() as i64 + 1;
                    state.raw.push(RawJob {
                        id,
                        source: job.source.clone(),
                        external_id: job.external_id.clone(),
                        title: job.title.clone(),
                        summary: job.summary.clone(),
                        content: job.content.clone(),
                        url: job.url.clone(),
                        tags: job.tags.clone(),
                        raw_payload: job.raw_payload.clone(),
                        published_at: job.published_at,
                        status: RawJobStatus::Pending,
                        reason: None,
                        trace: None,
                        created_at: now,
                        updated_at: now,
                    });
                    result.created += 1;
                    result.new_records.push(job);
                }
            }
        }

        Ok(result)
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<RawJob>, StoreError> {
        let limit = if limit <= 0 { 50 } else { limit as usize };
        let state = self.state.lock().unwrap();
        Ok(state
            .raw
            .iter()
            .filter(|raw| raw.status == RawJobStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: i64, update: RawStatusUpdate) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let raw = state
            .raw
            .iter_mut()
            .find(|raw| raw.id == id)
            .ok_or(StoreError::NotFound(id))?;
        raw.status = update.status;
        raw.reason = update.reason;
        if update.trace.is_some() {
            raw.trace = update.trace;
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn upsert_jobs(&self, jobs: Vec<Job>) -> Result<JobUpsert, StoreError> {
        self.job_upserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let mut result = JobUpsert::default();

        for job in jobs {
            if state.jobs.insert(job.id.clone(), job.clone()).is_none() {
                result.created += 1;
                result.new_jobs.push(job);
            }
        }

        Ok(result)
    }

    async fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<Job>, StoreError> {
        let wanted = flag_all(filter.effective_tags());
        let state = self.state.lock().unwrap();
        Ok(state
            .jobs
            .values()
            .filter(|job| job.matches_tags(&wanted))
            .cloned()
            .collect())
    }

    async fn count_jobs(&self, filter: &JobFilter) -> Result<i64, StoreError> {
        Ok(self.list_jobs(filter).await?.len() as i64)
    }
}

// =============================================================================
// Processor and notifier
// =============================================================================

/// Accepts titles containing "Remote", rejects the rest
#[derive(Default)]
pub struct TitleProcessor {
    pub fail_on: Option<String>,
}

#[async_trait]
impl JobProcessor for TitleProcessor {
    async fn process(&self, raw: &RawJob) -> Result<ProcessOutcome, ProcessError> {
        if self.fail_on.as_deref() == Some(raw.external_id.as_str()) {
            return Err(ProcessError::Parse(
                serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
            ));
        }

        let trace = Some(json!({ "prompt": raw.title, "llm_response": "{}" }));
        let decision = if raw.title.contains("Remote") {
            Decision::Accepted(Job {
                id: raw.external_id.clone(),
                title: raw.title.clone(),
                source: raw.source.clone(),
                url: raw.url.clone(),
                published_at: raw.published_at,
                ..Default::default()
            })
        } else {
            Decision::Rejected {
                reason: "onsite".to_string(),
            }
        };

        Ok(ProcessOutcome { decision, trace })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub batches: Mutex<Vec<Vec<String>>>,
    pub fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, jobs: &[Job]) -> Result<(), NotifyError> {
        self.batches
            .lock()
            .unwrap()
            .push(jobs.iter().map(|job| job.id.clone()).collect());
        if self.fail {
            return Err(NotifyError::Transport("mailbox unavailable".to_string()));
        }
        Ok(())
    }
}
