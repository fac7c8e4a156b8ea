//! Bootstrap history, one row per successful `App::new`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootRow {
    pub id: i32,
    pub version: String,
    pub commit_hash: String,
    pub booted_at: DateTime<Utc>,
}

/// Record a bootstrap and return the inserted row.
pub async fn record(pool: &PgPool, version: &str, commit_hash: &str) -> Result<BootRow, sqlx::Error> {
    sqlx::query_as::<_, BootRow>(
        "INSERT INTO boots (version, commit_hash) VALUES ($1, $2) \
         RETURNING id, version, commit_hash, booted_at",
    )
    .bind(version)
    .bind(commit_hash)
    .fetch_one(pool)
    .await
}

/// The most recent bootstrap, if any.
pub async fn latest(pool: &PgPool) -> Result<Option<BootRow>, sqlx::Error> {
    sqlx::query_as::<_, BootRow>(
        "SELECT id, version, commit_hash, booted_at FROM boots ORDER BY booted_at DESC, id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await
}

/// Total number of recorded bootstraps.
pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM boots")
        .fetch_one(pool)
        .await
}
