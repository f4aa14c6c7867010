use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Open a pool of at most `max_connections` and bring the schema up to date.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("run migrations")?;
    tracing::info!("database migrations applied");

    Ok(pool)
}
