//! Table definitions
//!
//! - `words_<code>`: one vocabulary table per supported language
//! - `translations_<a>_<b>`: one link table per registered language pair,
//!   codes sorted; `word_id1` references the first language
//! - `server_state`: named seed leases
//! - `settings`: key/value runtime settings

use crate::language::{Language, TableRegistry, TranslationTable};
use crate::Result;
use sqlx::SqlitePool;
use tracing::debug;

/// Create every table the seeding pipeline touches
pub async fn create_schema(pool: &SqlitePool, registry: &TableRegistry) -> Result<()> {
    create_settings_table(pool).await?;
    create_server_state_table(pool).await?;

    for lang in Language::ALL {
        create_vocabulary_table(pool, lang).await?;
    }

    for table in registry.tables() {
        create_translation_table(pool, &table).await?;
    }

    debug!(
        languages = Language::ALL.len(),
        pairs = registry.tables().len(),
        "Schema ready"
    );
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_server_state_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS server_state (
            name TEXT PRIMARY KEY,
            locked INTEGER NOT NULL DEFAULT 0,
            owner TEXT,
            acquired_at TEXT,
            expires_at TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_vocabulary_table(pool: &SqlitePool, lang: Language) -> Result<()> {
    let table = lang.vocabulary_table();
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            word TEXT NOT NULL,
            example TEXT NOT NULL DEFAULT '',
            type TEXT NOT NULL,
            level TEXT NOT NULL,
            comment TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
    );
    sqlx::query(&sql).execute(pool).await?;

    let index = format!("CREATE INDEX IF NOT EXISTS idx_{table}_type_level ON {table} (type, level)");
    sqlx::query(&index).execute(pool).await?;
    Ok(())
}

async fn create_translation_table(pool: &SqlitePool, table: &TranslationTable) -> Result<()> {
    let pair = table.pair();
    let name = table.name();
    let sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {name} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            word_id1 INTEGER NOT NULL REFERENCES {first}(id) ON DELETE CASCADE,
            word_id2 INTEGER NOT NULL REFERENCES {second}(id) ON DELETE CASCADE,
            UNIQUE (word_id1, word_id2)
        )
        "#,
        first = pair.first().vocabulary_table(),
        second = pair.second().vocabulary_table(),
    );
    sqlx::query(&sql).execute(pool).await?;

    let index = format!("CREATE INDEX IF NOT EXISTS idx_{name}_word_id2 ON {name} (word_id2)");
    sqlx::query(&index).execute(pool).await?;
    Ok(())
}
