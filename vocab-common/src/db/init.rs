//! Database initialization
//!
//! Opens (or creates) the SQLite database and brings the schema up to date.
//! All table creation is idempotent, so this runs on every startup.

use crate::language::TableRegistry;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Busy timeout applied to every connection
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path, registry: &TableRegistry) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    crate::db::schema::create_schema(&pool, registry).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Every connection to `:memory:` is a separate database, so the pool is
/// capped at one connection that is never recycled.
pub async fn init_memory_database(registry: &TableRegistry) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    crate::db::schema::create_schema(&pool, registry).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("vocab.db");

        let pool = init_database(&db_path, &TableRegistry::all_pairs())
            .await
            .unwrap();
        assert!(db_path.exists());

        let fk: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(fk, 1);
        pool.close().await;

        // Re-open is idempotent
        let pool = init_database(&db_path, &TableRegistry::all_pairs())
            .await
            .unwrap();
        pool.close().await;
    }
}
