use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(db_uri: &str, min_connections: u32, max_connections: u32) -> Result<PgPool> {
    info!(min_connections, max_connections, "Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .min_connections(min_connections)
        .max_connections(max_connections)
        .connect(db_uri)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}
