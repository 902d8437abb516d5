//! Translation link table operations

use tracing::debug;
use sqlx::SqlitePool;
use vocab_common::{Error, Language, Result, TranslationTable};

use crate::models::Connection;
use crate::utils::{retry_on_busy, DEFAULT_MAX_WAIT_MS};

/// Insert links produced as (source id, target id)
///
/// Links are re-oriented to the table's `word_id1`/`word_id2` columns.
/// Already-present links are ignored; returns the number of new rows.
pub async fn insert_links(
    pool: &SqlitePool,
    table: &TranslationTable,
    source_lang: Language,
    connections: &[Connection],
) -> Result<u64> {
    if connections.is_empty() {
        return Ok(0);
    }

    let swap = table.pair().first() != source_lang;
    let sql = format!(
        "INSERT OR IGNORE INTO {} (word_id1, word_id2) VALUES (?, ?)",
        table.name()
    );
    let sql = sql.as_str();

    let inserted = retry_on_busy("insert_links", DEFAULT_MAX_WAIT_MS, || async move {
        let mut tx = pool.begin().await?;
        let mut inserted = 0u64;
        for connection in connections {
            let link = if swap { connection.reversed() } else { *connection };
            inserted += sqlx::query(sql)
                .bind(link.word_id1)
                .bind(link.word_id2)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    })
    .await?;

    debug!(table = table.name(), inserted, "Inserted translation links");
    Ok(inserted)
}

pub async fn count_links(pool: &SqlitePool, table: &TranslationTable) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.name());
    Ok(sqlx::query_scalar(&sql).fetch_one(pool).await?)
}

/// Move links of `lang` words onto other words of the same language
///
/// `merges` holds `(from, to)` word ids. Every link of `from` in `tables` is
/// copied to `to` unless `to` already has it. The rows of `from` are left for
/// the caller to delete. Returns the number of links created.
pub async fn repoint_links(
    pool: &SqlitePool,
    lang: Language,
    tables: &[TranslationTable],
    merges: &[(i64, i64)],
) -> Result<u64> {
    if merges.is_empty() || tables.is_empty() {
        return Ok(0);
    }

    let mut statements = Vec::with_capacity(tables.len());
    for table in tables {
        let column = table.column_for(lang)?.as_str();
        let other = if column == "word_id1" { "word_id2" } else { "word_id1" };
        statements.push(format!(
            "INSERT OR IGNORE INTO {table} ({column}, {other})
             SELECT ?, {other} FROM {table} WHERE {column} = ?",
            table = table.name(),
        ));
    }
    let statements = statements.as_slice();

    let created = retry_on_busy("repoint_links", DEFAULT_MAX_WAIT_MS, || async move {
        let mut tx = pool.begin().await?;
        let mut created = 0u64;
        for sql in statements {
            for (from, to) in merges {
                created += sqlx::query(sql)
                    .bind(to)
                    .bind(from)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
            }
        }
        tx.commit().await?;
        Ok(created)
    })
    .await?;

    debug!(language = %lang, merges = merges.len(), created, "Re-pointed translation links");
    Ok(created)
}

/// Delete `lang` words not referenced by any of `tables`
///
/// Refuses to run with no tables: every word would count as untranslated.
pub async fn delete_untranslated(
    pool: &SqlitePool,
    lang: Language,
    tables: &[TranslationTable],
) -> Result<u64> {
    if tables.is_empty() {
        return Err(Error::Config(format!(
            "No translation tables registered for {}",
            lang
        )));
    }

    let mut referenced = Vec::with_capacity(tables.len());
    for table in tables {
        let column = table.column_for(lang)?;
        referenced.push(format!("SELECT {} FROM {}", column.as_str(), table.name()));
    }

    let sql = format!(
        "DELETE FROM {} WHERE id NOT IN ({})",
        lang.vocabulary_table(),
        referenced.join(" UNION ")
    );
    let sql = sql.as_str();

    retry_on_busy("delete_untranslated", DEFAULT_MAX_WAIT_MS, || async move {
        Ok(sqlx::query(sql).execute(pool).await?.rows_affected())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::vocabulary::{count_words, insert_words};
    use crate::models::NewWord;
    use vocab_common::db::init_memory_database;
    use vocab_common::{Level, TableRegistry};

    fn words(items: &[&str]) -> Vec<NewWord> {
        items
            .iter()
            .map(|w| NewWord {
                word: w.to_string(),
                example: String::new(),
                word_type: "noun".to_string(),
                level: Level::A1,
                comment: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_links_are_oriented_by_table() {
        let registry = TableRegistry::all_pairs();
        let pool = init_memory_database(&registry).await.unwrap();
        let ru = insert_words(&pool, Language::Ru, &words(&["кот"])).await.unwrap();
        let pl = insert_words(&pool, Language::Pl, &words(&["kot", "pies"])).await.unwrap();
        let table = registry.translation_table(Language::Ru, Language::Pl).unwrap();

        // Source ru, target pl: ru is the table's second language
        let connections = [Connection {
            word_id1: ru[0].id,
            word_id2: pl[0].id,
        }];
        assert_eq!(insert_links(&pool, &table, Language::Ru, &connections).await.unwrap(), 1);

        let (id1, id2): (i64, i64) =
            sqlx::query_as("SELECT word_id1, word_id2 FROM translations_pl_ru")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!((id1, id2), (pl[0].id, ru[0].id));

        // Same link again, from the other side, is ignored
        let reversed = [connections[0].reversed()];
        assert_eq!(insert_links(&pool, &table, Language::Pl, &reversed).await.unwrap(), 0);
        assert_eq!(count_links(&pool, &table).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_untranslated_is_idempotent() {
        let registry = TableRegistry::all_pairs();
        let pool = init_memory_database(&registry).await.unwrap();
        let pl = insert_words(&pool, Language::Pl, &words(&["kot", "pies", "ryba"])).await.unwrap();
        let ru = insert_words(&pool, Language::Ru, &words(&["кот"])).await.unwrap();
        let en = insert_words(&pool, Language::En, &words(&["dog"])).await.unwrap();

        let pl_ru = registry.translation_table(Language::Pl, Language::Ru).unwrap();
        let en_pl = registry.translation_table(Language::Pl, Language::En).unwrap();
        insert_links(&pool, &pl_ru, Language::Pl, &[Connection { word_id1: pl[0].id, word_id2: ru[0].id }])
            .await
            .unwrap();
        insert_links(&pool, &en_pl, Language::Pl, &[Connection { word_id1: pl[1].id, word_id2: en[0].id }])
            .await
            .unwrap();

        let tables = registry.tables_for(Language::Pl);
        assert_eq!(delete_untranslated(&pool, Language::Pl, &tables).await.unwrap(), 1);
        assert_eq!(delete_untranslated(&pool, Language::Pl, &tables).await.unwrap(), 0);
        assert_eq!(count_words(&pool, Language::Pl).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_repoint_links_skips_existing() {
        let registry = TableRegistry::all_pairs();
        let pool = init_memory_database(&registry).await.unwrap();
        let pl = insert_words(&pool, Language::Pl, &words(&["kot", "kocur"])).await.unwrap();
        let ru = insert_words(&pool, Language::Ru, &words(&["кот", "Кот"])).await.unwrap();
        let pl_ru = registry.translation_table(Language::Pl, Language::Ru).unwrap();
        let links = [
            Connection { word_id1: pl[0].id, word_id2: ru[0].id },
            Connection { word_id1: pl[0].id, word_id2: ru[1].id },
            Connection { word_id1: pl[1].id, word_id2: ru[1].id },
        ];
        insert_links(&pool, &pl_ru, Language::Pl, &links).await.unwrap();

        // ru[1] folds into ru[0]; kot↔кот already exists, kocur↔кот is new
        let tables = registry.tables_for(Language::Ru);
        let created = repoint_links(&pool, Language::Ru, &tables, &[(ru[1].id, ru[0].id)])
            .await
            .unwrap();
        assert_eq!(created, 1);
        assert_eq!(count_links(&pool, &pl_ru).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_delete_untranslated_requires_tables() {
        let pool = init_memory_database(&TableRegistry::all_pairs()).await.unwrap();
        insert_words(&pool, Language::De, &words(&["Hund"])).await.unwrap();

        let err = delete_untranslated(&pool, Language::De, &[]).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(count_words(&pool, Language::De).await.unwrap(), 1);
    }
}
