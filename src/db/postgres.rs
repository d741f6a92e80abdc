use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection pool shared by every store; sized from configuration so a
/// deployment can match it to its Postgres connection limit
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;

    Ok(pool)
}
