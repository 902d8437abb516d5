//! Vocabulary table operations
//!
//! Table names come from [`Language::vocabulary_table`], never from input.

use futures::TryStreamExt;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use vocab_common::{time, Language, Level, Result};

use crate::models::{CorrectedWord, NewWord, VocabularyWord, WordRef};
use crate::utils::{retry_on_busy, DEFAULT_MAX_WAIT_MS};

/// Rows deleted per statement in bulk deletes
const DELETE_CHUNK: usize = 500;

/// Insert words in one transaction and return their new ids, in input order
pub async fn insert_words(pool: &SqlitePool, lang: Language, words: &[NewWord]) -> Result<Vec<WordRef>> {
    if words.is_empty() {
        return Ok(Vec::new());
    }
    retry_on_busy("insert_words", DEFAULT_MAX_WAIT_MS, || insert_words_once(pool, lang, words)).await
}

async fn insert_words_once(pool: &SqlitePool, lang: Language, words: &[NewWord]) -> Result<Vec<WordRef>> {
    let sql = format!(
        "INSERT INTO {} (word, example, type, level, comment, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        lang.vocabulary_table()
    );

    let mut tx = pool.begin().await?;
    let mut inserted = Vec::with_capacity(words.len());

    for word in words {
        let now = time::now_db();
        let id: i64 = sqlx::query_scalar(&sql)
            .bind(word.word.trim())
            .bind(&word.example)
            .bind(&word.word_type)
            .bind(word.level.as_str())
            .bind(normalize_comment(word.comment.as_deref()))
            .bind(&now)
            .bind(&now)
            .fetch_one(&mut *tx)
            .await?;
        inserted.push(WordRef {
            id,
            word: word.word.trim().to_string(),
        });
    }

    tx.commit().await?;
    debug!(language = %lang, count = inserted.len(), "Inserted words");
    Ok(inserted)
}

/// Existing words containing `fragment`, case-insensitively, newest first
///
/// SQLite's own case folding only covers ASCII, so rows are streamed newest
/// first and folded here with Unicode lowercasing until `limit` matches.
pub async fn words_containing(
    pool: &SqlitePool,
    lang: Language,
    fragment: &str,
    limit: usize,
) -> Result<Vec<String>> {
    let needle = fragment.to_lowercase();
    let sql = format!(
        "SELECT word FROM {} ORDER BY created_at DESC, id DESC",
        lang.vocabulary_table()
    );

    let mut rows = sqlx::query_scalar::<_, String>(&sql).fetch(pool);
    let mut words = Vec::new();
    while words.len() < limit {
        let Some(word) = rows.try_next().await? else {
            break;
        };
        if word.to_lowercase().contains(&needle) {
            words.push(word);
        }
    }
    Ok(words)
}

/// Most recent words with the given level and, optionally, type
pub async fn recent_words(
    pool: &SqlitePool,
    lang: Language,
    level: Level,
    word_type: Option<&str>,
    limit: usize,
) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT word FROM {}
         WHERE level = ? AND (? IS NULL OR type = ?)
         ORDER BY created_at DESC, id DESC
         LIMIT ?",
        lang.vocabulary_table()
    );

    let words = sqlx::query_scalar(&sql)
        .bind(level.as_str())
        .bind(word_type)
        .bind(word_type)
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;
    Ok(words)
}

/// All words of one grammatical type, oldest first
pub async fn words_by_type(pool: &SqlitePool, lang: Language, word_type: &str) -> Result<Vec<VocabularyWord>> {
    let sql = format!(
        "SELECT id, word, example, type, level, comment, created_at, updated_at
         FROM {} WHERE type = ? ORDER BY id",
        lang.vocabulary_table()
    );

    let rows = sqlx::query(&sql).bind(word_type).fetch_all(pool).await?;
    rows.iter().map(row_to_word).collect()
}

/// Overwrite a row's editable fields and bump `updated_at`
///
/// Returns false when the id no longer exists.
pub async fn update_word(pool: &SqlitePool, lang: Language, word: &CorrectedWord) -> Result<bool> {
    let sql = format!(
        "UPDATE {} SET word = ?, example = ?, type = ?, level = ?, comment = ?, updated_at = ?
         WHERE id = ?",
        lang.vocabulary_table()
    );
    let sql = sql.as_str();

    let result = retry_on_busy("update_word", DEFAULT_MAX_WAIT_MS, || async move {
        Ok(sqlx::query(sql)
            .bind(word.word.trim())
            .bind(&word.example)
            .bind(&word.word_type)
            .bind(word.level.as_str())
            .bind(normalize_comment(word.comment.as_deref()))
            .bind(time::now_db())
            .bind(word.id)
            .execute(pool)
            .await?)
    })
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn count_words(pool: &SqlitePool, lang: Language) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", lang.vocabulary_table());
    Ok(sqlx::query_scalar(&sql).fetch_one(pool).await?)
}

/// `(id, word, created_at)` for every row, the input to deduplication
pub async fn word_keys(pool: &SqlitePool, lang: Language) -> Result<Vec<(i64, String, String)>> {
    let sql = format!("SELECT id, word, created_at FROM {}", lang.vocabulary_table());
    Ok(sqlx::query_as(&sql).fetch_all(pool).await?)
}

/// Delete rows by id in one transaction; link rows cascade
pub async fn delete_words(pool: &SqlitePool, lang: Language, ids: &[i64]) -> Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    retry_on_busy("delete_words", DEFAULT_MAX_WAIT_MS, || async move {
        let mut tx = pool.begin().await?;
        let mut deleted = 0u64;

        for chunk in ids.chunks(DELETE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "DELETE FROM {} WHERE id IN ({})",
                lang.vocabulary_table(),
                placeholders
            );
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            deleted += query.execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(deleted)
    })
    .await
}

fn row_to_word(row: &sqlx::sqlite::SqliteRow) -> Result<VocabularyWord> {
    let level: String = row.get("level");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(VocabularyWord {
        id: row.get("id"),
        word: row.get("word"),
        example: row.get("example"),
        word_type: row.get("type"),
        level: level.parse()?,
        comment: row.get("comment"),
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
    })
}

/// Empty comments are stored as NULL
fn normalize_comment(comment: Option<&str>) -> Option<&str> {
    comment.map(str::trim).filter(|c| !c.is_empty())
}
