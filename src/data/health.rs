//! Database connection liveness.

use sqlx::{Connection, PgPool};

/// Whether the pool can hand out a live connection right now.
///
/// Returns `Ok(false)` for a closed pool without touching the network.
pub async fn is_active(pool: &PgPool) -> Result<bool, sqlx::Error> {
    if pool.is_closed() {
        return Ok(false);
    }
    let mut conn = pool.acquire().await?;
    conn.ping().await?;
    Ok(true)
}
