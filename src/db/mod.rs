pub mod models;
pub mod queries;

use sqlx::{Pool, Sqlite, SqlitePool};
use anyhow::Result;

pub async fn init_pool(database_url: &str) -> Result<Pool<Sqlite>> {
    let pool = SqlitePool::connect(database_url).await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    Ok(pool)
}

/// Single-connection in-memory database; every connection to `sqlite::memory:`
/// would otherwise see its own empty schema.
#[cfg(test)]
pub async fn init_memory_pool() -> Result<Pool<Sqlite>> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await?;

    Ok(pool)
}
