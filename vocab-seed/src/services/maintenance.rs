//! Post-run maintenance passes
//!
//! Both passes are idempotent: a second run right after the first deletes
//! nothing.

use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::info;
use vocab_common::{Language, Result, TableRegistry};

use crate::db::{translations, vocabulary};

/// Delete case-insensitive duplicate words, keeping the earliest row
///
/// Case folding is Unicode-aware. Among rows with equal folded words the one
/// with the smallest `created_at` survives, ties broken by lowest id. Links
/// of deleted rows are moved to the survivor first, so a word that was only
/// linked through a duplicate keeps its translation.
pub async fn dedup_language(pool: &SqlitePool, registry: &TableRegistry, lang: Language) -> Result<u64> {
    let rows = vocabulary::word_keys(pool, lang).await?;
    let merges = duplicate_merges(rows);
    if merges.is_empty() {
        info!(language = %lang, removed = 0, "Deduplication finished");
        return Ok(0);
    }

    let tables = registry.tables_for(lang);
    let moved = translations::repoint_links(pool, lang, &tables, &merges).await?;

    let losers: Vec<i64> = merges.iter().map(|(loser, _)| *loser).collect();
    let removed = vocabulary::delete_words(pool, lang, &losers).await?;
    info!(language = %lang, removed, links_moved = moved, "Deduplication finished");
    Ok(removed)
}

/// `(duplicate, survivor)` id pairs from `(id, word, created_at)` rows,
/// ordered by duplicate id
fn duplicate_merges(rows: Vec<(i64, String, String)>) -> Vec<(i64, i64)> {
    let mut groups: HashMap<String, Vec<(String, i64)>> = HashMap::new();
    for (id, word, created_at) in rows {
        groups
            .entry(word.trim().to_lowercase())
            .or_default()
            .push((created_at, id));
    }

    let mut merges = Vec::new();
    for mut group in groups.into_values() {
        if group.len() < 2 {
            continue;
        }
        group.sort_unstable();
        let survivor = group[0].1;
        merges.extend(group[1..].iter().map(|(_, id)| (*id, survivor)));
    }

    merges.sort_unstable();
    merges
}

/// Delete words of `lang` that no registered link table references
pub async fn remove_orphans(pool: &SqlitePool, registry: &TableRegistry, lang: Language) -> Result<u64> {
    let tables = registry.tables_for(lang);
    let removed = translations::delete_untranslated(pool, lang, &tables).await?;
    info!(language = %lang, tables = tables.len(), removed, "Orphan removal finished");
    Ok(removed)
}
