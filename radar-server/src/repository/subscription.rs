//! Subscription Repository
//!
//! Handles all database operations related to subscriptions.

use chrono::{DateTime, Utc};
use radar_core::domain::subscription::Subscription;
use radar_core::domain::tags::TagMap;
use radar_core::dto::subscription::NewSubscription;
use sqlx::SqlitePool;
use sqlx::types::Json;

/// Create a new subscription in the database
pub async fn create(pool: &SqlitePool, req: NewSubscription) -> Result<Subscription, sqlx::Error> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO subscriptions (email, channel, tags, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&req.email)
    .bind(&req.channel)
    .bind(Json(&req.tags))
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Subscription {
        id: result.last_insert_rowid(),
        email: req.email,
        channel: req.channel,
        tags: req.tags,
        created_at: now,
    })
}

/// List all subscriptions, oldest first
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Subscription>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SubscriptionRow>(
        r#"
        SELECT id, email, channel, tags, created_at
        FROM subscriptions
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    email: String,
    channel: String,
    tags: Json<TagMap>,
    created_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: row.id,
            email: row.email,
            channel: row.channel,
            tags: row.tags.0,
            created_at: row.created_at,
        }
    }
}
