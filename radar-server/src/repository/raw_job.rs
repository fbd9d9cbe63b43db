//! Raw Job Repository
//!
//! Handles all database operations on the crawl ledger.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use radar_core::domain::raw_job::{RawJob, RawJobStatus};
use radar_core::domain::tags::TagMap;
use radar_core::dto::raw_job::{NewRawJob, RawStatusUpdate};
use radar_pipeline::store::RawUpsert;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::types::Json;

const DEFAULT_PENDING_LIMIT: i64 = 50;

/// Insert unseen crawl records and refresh the descriptive fields of known ones
///
/// Keys are checked before writing, so `created` counts each new
/// `(source, external_id)` once even when the batch repeats it.
pub async fn upsert_batch(pool: &SqlitePool, jobs: &[NewRawJob]) -> Result<RawUpsert, sqlx::Error> {
    let mut result = RawUpsert::default();
    if jobs.is_empty() {
        return Ok(result);
    }

    let now = Utc::now();
    let mut seen = HashSet::new();
    let mut tx = pool.begin().await?;

    for job in jobs {
        if seen.insert((job.source.as_str(), job.external_id.as_str())) {
            let (existing,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM raw_jobs WHERE source = ? AND external_id = ?",
            )
            .bind(&job.source)
            .bind(&job.external_id)
            .fetch_one(&mut *tx)
            .await?;

            if existing == 0 {
                result.created += 1;
                result.new_records.push(job.clone());
            }
        }

        sqlx::query(
            r#"
            INSERT INTO raw_jobs (source, external_id, title, summary, content, url, tags,
                                  raw_payload, published_at, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source, external_id) DO UPDATE SET
                title = excluded.title,
                summary = excluded.summary,
                content = excluded.content,
                url = excluded.url,
                tags = excluded.tags,
                raw_payload = excluded.raw_payload,
                published_at = excluded.published_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&job.source)
        .bind(&job.external_id)
        .bind(&job.title)
        .bind(&job.summary)
        .bind(&job.content)
        .bind(&job.url)
        .bind(Json(&job.tags))
        .bind(Json(&job.raw_payload))
        .bind(job.published_at)
        .bind(RawJobStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(result)
}

/// List pending raw jobs, oldest first
pub async fn list_pending(pool: &SqlitePool, limit: i64) -> Result<Vec<RawJob>, sqlx::Error> {
    let limit = if limit <= 0 { DEFAULT_PENDING_LIMIT } else { limit };

    let rows = sqlx::query_as::<_, RawJobRow>(
        r#"
        SELECT id, source, external_id, title, summary, content, url, tags, raw_payload,
               published_at, status, reason, trace, created_at, updated_at
        FROM raw_jobs
        WHERE status = ?
        ORDER BY created_at ASC, id ASC
        LIMIT ?
        "#,
    )
    .bind(RawJobStatus::Pending.as_str())
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Record a classification outcome
///
/// An empty reason is stored as NULL and a missing trace keeps the stored one.
/// Returns `false` when no row has this id.
pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    update: &RawStatusUpdate,
) -> Result<bool, sqlx::Error> {
    let reason = update
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|reason| !reason.is_empty());

    let result = sqlx::query(
        r#"
        UPDATE raw_jobs
        SET status = ?, reason = ?, trace = COALESCE(?, trace), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(update.status.as_str())
    .bind(reason)
    .bind(update.trace.as_ref().map(Json))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RawJobRow {
    id: i64,
    source: String,
    external_id: String,
    title: String,
    summary: String,
    content: String,
    url: String,
    tags: Json<TagMap>,
    raw_payload: Json<Value>,
    published_at: DateTime<Utc>,
    status: String,
    reason: Option<String>,
    trace: Option<Json<Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RawJobRow> for RawJob {
    fn from(row: RawJobRow) -> Self {
        RawJob {
            id: row.id,
            source: row.source,
            external_id: row.external_id,
            title: row.title,
            summary: row.summary,
            content: row.content,
            url: row.url,
            tags: row.tags.0,
            raw_payload: row.raw_payload.0,
            published_at: row.published_at,
            status: row.status.parse().unwrap_or(RawJobStatus::Pending),
            reason: row.reason,
            trace: row.trace.map(|trace| trace.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use chrono::TimeZone;
    use radar_core::domain::tags::flag_all;
    use serde_json::json;

    fn record(external_id: &str, title: &str) -> NewRawJob {
        NewRawJob {
            source: "eleduck".to_string(),
            external_id: external_id.to_string(),
            title: title.to_string(),
            summary: format!("{} summary", title),
            content: String::new(),
            url: format!("https://eleduck.com/posts/{}", external_id),
            tags: flag_all(["remote"]),
            raw_payload: json!({ "id": external_id }),
            published_at: Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upsert_counts_new_keys_once() {
        let pool = memory_pool().await;

        let batch = vec![record("a", "First"), record("b", "Second"), record("a", "Again")];
        let result = upsert_batch(&pool, &batch).await.unwrap();

        assert_eq!(result.created, 2);
        assert_eq!(result.new_records.len(), 2);
        assert_eq!(result.new_records[0].title, "First");

        let pending = list_pending(&pool, 0).await.unwrap();
        assert_eq!(pending.len(), 2);
        // Later duplicates overwrite the descriptive fields
        assert_eq!(pending[0].title, "Again");
        assert_eq!(pending[0].status, RawJobStatus::Pending);
        assert!(pending[0].id < pending[1].id);
    }

    #[tokio::test]
    async fn test_recrawl_keeps_classification() {
        let pool = memory_pool().await;
        upsert_batch(&pool, &[record("a", "First")]).await.unwrap();

        let id = list_pending(&pool, 10).await.unwrap()[0].id;
        let trace = json!({ "prompt": "p", "llm_response": "r" });
        assert!(
            update_status(&pool, id, &RawStatusUpdate::rejected("not_remote", Some(trace.clone())))
                .await
                .unwrap()
        );

        let result = upsert_batch(&pool, &[record("a", "Renamed")]).await.unwrap();
        assert_eq!(result.created, 0);
        assert!(result.new_records.is_empty());
        assert!(list_pending(&pool, 10).await.unwrap().is_empty());

        let (title, status, reason, stored_trace): (String, String, Option<String>, Option<Json<Value>>) =
            sqlx::query_as("SELECT title, status, reason, trace FROM raw_jobs WHERE id = ?")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(title, "Renamed");
        assert_eq!(status, "rejected");
        assert_eq!(reason.as_deref(), Some("not_remote"));
        assert_eq!(stored_trace.map(|t| t.0), Some(trace));
    }

    #[tokio::test]
    async fn test_update_status_unknown_id() {
        let pool = memory_pool().await;
        let updated = update_status(&pool, 42, &RawStatusUpdate::processed(None))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_empty_reason_is_null_and_trace_is_kept() {
        let pool = memory_pool().await;
        upsert_batch(&pool, &[record("a", "First")]).await.unwrap();
        let id = list_pending(&pool, 10).await.unwrap()[0].id;

        let trace = json!({ "prompt": "p" });
        update_status(&pool, id, &RawStatusUpdate::rejected("  ", Some(trace.clone())))
            .await
            .unwrap();
        update_status(&pool, id, &RawStatusUpdate::processed(None))
            .await
            .unwrap();

        let (reason, stored_trace): (Option<String>, Option<Json<Value>>) =
            sqlx::query_as("SELECT reason, trace FROM raw_jobs WHERE id = ?")
                .bind(id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(reason.is_none());
        assert_eq!(stored_trace.map(|t| t.0), Some(trace));
    }

    #[tokio::test]
    async fn test_list_pending_respects_limit() {
        let pool = memory_pool().await;
        let batch: Vec<_> = (0..5).map(|i| record(&i.to_string(), "Job")).collect();
        upsert_batch(&pool, &batch).await.unwrap();

        let pending = list_pending(&pool, 3).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|job| job.external_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
    }
}
