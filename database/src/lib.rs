pub mod change_notifier;
pub mod clock;
pub mod database_error;
mod database_path;
pub mod models;
pub mod repository;
pub mod repository_manager;

use std::{str::FromStr, sync::Arc};

use sqlx::{
    migrate,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite, SqlitePool,
};

pub use database_path::get_database_url;

/// Connects to the application database, creating the file when missing, and applies
/// pending migrations.
pub async fn get_db_pool() -> Result<Arc<Pool<Sqlite>>, sqlx::Error> {
    let db_url = database_path::get_database_url()
        .map_err(|e| sqlx::Error::Configuration(Box::new(e)))?;
    tracing::debug!(db_url, "Connecting to database");
    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    migrate!("./migrations").run(&pool).await?;
    Ok(Arc::new(pool))
}

pub async fn setup_test_db() -> SqlitePool {
    // A single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to the in-memory SQLite database");

    migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}
