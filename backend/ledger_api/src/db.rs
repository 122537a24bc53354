//! Database layer: migrations, journal writes and journal reads.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::Result;
use crate::events::{EventRecord, NewEvent};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    // Every connection to `:memory:` opens its own database.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Append one event to the journal, returning its row id.
pub async fn insert_event(pool: &SqlitePool, event: &NewEvent) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO events
            (event_type, campaign_id, actor, amount, payload, recorded_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&event.event_type)
    .bind(event.campaign_id)
    .bind(&event.actor)
    .bind(&event.amount)
    .bind(&event.payload)
    .bind(event.recorded_at)
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// Fetch all events for a given campaign, in publication order.
pub async fn get_events_for_campaign(
    pool: &SqlitePool,
    campaign_id: i64,
) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_type, campaign_id, actor, amount, payload, recorded_at
        FROM   events
        WHERE  campaign_id = ?1
        ORDER  BY id ASC
        "#,
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch all events, in publication order.
pub async fn get_all_events(pool: &SqlitePool) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_type, campaign_id, actor, amount, payload, recorded_at
        FROM   events
        ORDER  BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
