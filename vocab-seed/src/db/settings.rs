//! Settings database operations
//!
//! Key/value accessors over the `settings` table. The generation API key
//! stored here takes precedence over the environment and TOML tiers.

use sqlx::{Pool, Sqlite};
use vocab_common::{Error, Result};

const GENERATION_API_KEY: &str = "generation_api_key";
const GENERATION_MODEL: &str = "generation_model";

/// Get generation API key from database
pub async fn get_generation_api_key(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, GENERATION_API_KEY).await
}

/// Set generation API key in database
pub async fn set_generation_api_key(db: &Pool<Sqlite>, key: String) -> Result<()> {
    set_setting(db, GENERATION_API_KEY, key).await
}

/// Model override; the TOML value applies when unset
pub async fn get_generation_model(db: &Pool<Sqlite>) -> Result<Option<String>> {
    get_setting::<String>(db, GENERATION_MODEL).await
}

pub async fn set_generation_model(db: &Pool<Sqlite>, model: String) -> Result<()> {
    set_setting(db, GENERATION_MODEL, model).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}
