use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{config::DatabaseConfig, error::Result};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connects to Postgres and applies pending migrations from `migrations/`.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.url)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    tracing::info!(
        "Inventory database ready ({} max connections, migrations applied)",
        config.max_connections
    );

    Ok(pool)
}

pub async fn check_health(pool: &PgPool) -> Result<()> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
