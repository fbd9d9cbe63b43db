//! Job Repository
//!
//! Handles all database operations related to classified jobs.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use radar_core::domain::job::Job;
use radar_core::domain::tags::TagMap;
use radar_core::dto::job::JobFilter;
use radar_pipeline::store::JobUpsert;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

const JOB_COLUMNS: &str = "id, title, summary, published_at, source, url, tags, raw_attributes, \
     normalized_tags, skill_tags, employment_type, salary_range, role_category, \
     language_requirement, score, verdict, created_at, updated_at";

// Mirrors `radar_core::domain::tags::is_truthy` over a json_each row
const TRUTHY_TAG: &str = " AND (t.type IN ('true', 'array', 'object') \
     OR (t.type IN ('integer', 'real') AND t.value != 0) \
     OR (t.type = 'text' AND lower(trim(t.value)) = 'true')))";

/// Insert unseen jobs and replace the fields of known ones
///
/// The id and `created_at` of an existing row never change.
pub async fn upsert_batch(pool: &SqlitePool, jobs: &[Job]) -> Result<JobUpsert, sqlx::Error> {
    let mut result = JobUpsert::default();
    if jobs.is_empty() {
        return Ok(result);
    }

    let now = Utc::now();
    let mut seen = HashSet::new();
    let mut tx = pool.begin().await?;

    for job in jobs {
        if seen.insert(job.id.as_str()) {
            let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE id = ?")
                .bind(&job.id)
                .fetch_one(&mut *tx)
                .await?;

            if existing == 0 {
                result.created += 1;
                result.new_jobs.push(job.clone());
            }
        }

        sqlx::query(
            r#"
            INSERT INTO jobs (id, title, summary, published_at, source, url, tags, raw_attributes,
                              normalized_tags, skill_tags, employment_type, salary_range,
                              role_category, language_requirement, score, verdict,
                              created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                summary = excluded.summary,
                published_at = excluded.published_at,
                source = excluded.source,
                url = excluded.url,
                tags = excluded.tags,
                raw_attributes = excluded.raw_attributes,
                normalized_tags = excluded.normalized_tags,
                skill_tags = excluded.skill_tags,
                employment_type = excluded.employment_type,
                salary_range = excluded.salary_range,
                role_category = excluded.role_category,
                language_requirement = excluded.language_requirement,
                score = excluded.score,
                verdict = excluded.verdict,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&job.id)
        .bind(&job.title)
        .bind(&job.summary)
        .bind(job.published_at)
        .bind(&job.source)
        .bind(&job.url)
        .bind(Json(&job.tags))
        .bind(Json(&job.raw_attributes))
        .bind(Json(&job.normalized_tags))
        .bind(Json(&job.skill_tags))
        .bind(&job.employment_type)
        .bind(&job.salary_range)
        .bind(&job.role_category)
        .bind(&job.language_requirement)
        .bind(job.score)
        .bind(&job.verdict)
        .bind(job.created_at.unwrap_or(now))
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(result)
}

/// List jobs carrying every requested tag, newest first
pub async fn list(pool: &SqlitePool, filter: &JobFilter) -> Result<Vec<Job>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM jobs", JOB_COLUMNS));
    push_tag_filter(&mut builder, filter);

    builder.push(" ORDER BY published_at DESC, id ASC LIMIT ");
    // SQLite reads a negative limit as unbounded
    builder.push_bind(if filter.limit > 0 { filter.limit } else { -1 });
    builder.push(" OFFSET ");
    builder.push_bind(filter.offset.max(0));

    let rows = builder
        .build_query_as::<JobRow>()
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Count jobs carrying every requested tag
pub async fn count(pool: &SqlitePool, filter: &JobFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM jobs");
    push_tag_filter(&mut builder, filter);

    let (total,) = builder
        .build_query_as::<(i64,)>()
        .fetch_one(pool)
        .await?;
    Ok(total)
}

// =============================================================================
// Helper Functions
// =============================================================================

fn push_tag_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &JobFilter) {
    for (index, tag) in filter.effective_tags().enumerate() {
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        builder.push("EXISTS (SELECT 1 FROM json_each(jobs.normalized_tags) AS t WHERE t.key = ");
        builder.push_bind(tag.to_string());
        builder.push(TRUTHY_TAG);
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    title: String,
    summary: String,
    published_at: DateTime<Utc>,
    source: String,
    url: String,
    tags: Json<TagMap>,
    raw_attributes: Json<Value>,
    normalized_tags: Json<TagMap>,
    skill_tags: Json<TagMap>,
    employment_type: String,
    salary_range: String,
    role_category: String,
    language_requirement: String,
    score: i32,
    verdict: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            title: row.title,
            summary: row.summary,
            published_at: row.published_at,
            source: row.source,
            url: row.url,
            tags: row.tags.0,
            raw_attributes: row.raw_attributes.0,
            normalized_tags: row.normalized_tags.0,
            skill_tags: row.skill_tags.0,
            employment_type: row.employment_type,
            salary_range: row.salary_range,
            role_category: row.role_category,
            language_requirement: row.language_requirement,
            score: row.score,
            verdict: row.verdict,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}
