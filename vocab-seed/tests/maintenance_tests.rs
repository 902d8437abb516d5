//! Dedup, orphan removal and validator passes

mod helpers;

use helpers::{generator, memory_db, ScriptedService};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use vocab_common::{Language, Level, TableRegistry};
use vocab_seed::db::{translations, vocabulary};
use vocab_seed::models::{Connection, NewWord, ValidationOptions, WordRef};
use vocab_seed::services::{dedup_language, remove_orphans, PromptKind, Validator};

fn word(text: &str, word_type: &str) -> NewWord {
    NewWord {
        word: text.to_string(),
        example: format!("{} w zdaniu.", text),
        word_type: word_type.to_string(),
        level: Level::A2,
        comment: None,
    }
}

async fn insert(pool: &SqlitePool, lang: Language, words: &[&str]) -> Vec<WordRef> {
    let words: Vec<NewWord> = words.iter().map(|w| word(w, "noun")).collect();
    vocabulary::insert_words(pool, lang, &words).await.unwrap()
}

async fn link(pool: &SqlitePool, source: &WordRef, target: &WordRef) {
    let table = TableRegistry::all_pairs()
        .translation_table(Language::Pl, Language::Ru)
        .unwrap();
    let connection = Connection {
        word_id1: source.id,
        word_id2: target.id,
    };
    translations::insert_links(pool, &table, Language::Pl, &[connection])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_dedup_keeps_earliest_and_is_idempotent() {
    let pool = memory_db().await;
    insert(&pool, Language::Pl, &["Dom"]).await;
    insert(&pool, Language::Pl, &["dom", "DOM", "kot"]).await;

    assert_eq!(dedup_language(&pool, &TableRegistry::all_pairs(), Language::Pl).await.unwrap(), 2);
    assert_eq!(dedup_language(&pool, &TableRegistry::all_pairs(), Language::Pl).await.unwrap(), 0);

    let remaining = vocabulary::words_containing(&pool, Language::Pl, "dom", 10).await.unwrap();
    assert_eq!(remaining, vec!["Dom".to_string()]);
}

#[tokio::test]
async fn test_dedup_folds_cyrillic_case() {
    let pool = memory_db().await;
    insert(&pool, Language::Ru, &["Дом", "дом", "кот"]).await;

    assert_eq!(dedup_language(&pool, &TableRegistry::all_pairs(), Language::Ru).await.unwrap(), 1);
    assert_eq!(vocabulary::count_words(&pool, Language::Ru).await.unwrap(), 2);
}

#[tokio::test]
async fn test_dedup_moves_links_to_survivor() {
    let pool = memory_db().await;
    let registry = TableRegistry::all_pairs();
    let pl = insert(&pool, Language::Pl, &["kot", "kocur"]).await;
    let ru = insert(&pool, Language::Ru, &["кот"]).await;
    let newer = insert(&pool, Language::Ru, &["Кот"]).await;
    link(&pool, &pl[0], &ru[0]).await;
    link(&pool, &pl[1], &newer[0]).await;

    assert_eq!(dedup_language(&pool, &registry, Language::Ru).await.unwrap(), 1);

    let table = registry.translation_table(Language::Pl, Language::Ru).unwrap();
    assert_eq!(translations::count_links(&pool, &table).await.unwrap(), 2);

    // "kocur" is still translated, so orphan removal keeps it
    assert_eq!(remove_orphans(&pool, &registry, Language::Pl).await.unwrap(), 0);
    assert_eq!(vocabulary::count_words(&pool, Language::Pl).await.unwrap(), 2);
    assert_eq!(vocabulary::count_words(&pool, Language::Ru).await.unwrap(), 1);
}

#[tokio::test]
async fn test_dedup_drops_links_already_on_survivor() {
    let pool = memory_db().await;
    let registry = TableRegistry::all_pairs();
    let pl = insert(&pool, Language::Pl, &["kot"]).await;
    let ru = insert(&pool, Language::Ru, &["кот"]).await;
    let newer = insert(&pool, Language::Ru, &["Кот"]).await;
    link(&pool, &pl[0], &ru[0]).await;
    link(&pool, &pl[0], &newer[0]).await;

    assert_eq!(dedup_language(&pool, &registry, Language::Ru).await.unwrap(), 1);

    let table = registry.translation_table(Language::Pl, Language::Ru).unwrap();
    assert_eq!(translations::count_links(&pool, &table).await.unwrap(), 1);
}

#[tokio::test]
async fn test_remove_orphans_keeps_linked_words() {
    let pool = memory_db().await;
    let pl = insert(&pool, Language::Pl, &["kot", "pies", "ryba"]).await;
    let ru = insert(&pool, Language::Ru, &["кот"]).await;
    link(&pool, &pl[0], &ru[0]).await;

    let registry = TableRegistry::all_pairs();
    assert_eq!(remove_orphans(&pool, &registry, Language::Pl).await.unwrap(), 2);
    assert_eq!(remove_orphans(&pool, &registry, Language::Pl).await.unwrap(), 0);
    assert_eq!(vocabulary::count_words(&pool, Language::Pl).await.unwrap(), 1);
    assert_eq!(vocabulary::count_words(&pool, Language::Ru).await.unwrap(), 1);
}

fn validation(dry_run: bool) -> ValidationOptions {
    ValidationOptions {
        language: Language::Pl,
        word_type: "noun".to_string(),
        batch_size: 2,
        delay_ms: 0,
        dry_run,
    }
}

fn capitalize_word(entry: &mut Value) {
    if let Some(word) = entry["word"].as_str() {
        let mut chars = word.chars();
        let fixed: String = chars
            .next()
            .map(|c| c.to_uppercase().chain(chars).collect())
            .unwrap_or_default();
        entry["word"] = Value::String(fixed);
    }
}

#[tokio::test]
async fn test_validator_echo_writes_nothing() {
    let pool = memory_db().await;
    insert(&pool, Language::Pl, &["kot", "pies", "ryba"]).await;
    let service = Arc::new(ScriptedService::new());

    let report = Validator::new(pool.clone(), generator(&service))
        .run(&validation(false))
        .await
        .unwrap();

    assert_eq!(report.checked, 3);
    assert_eq!(report.changed, 0);
    assert_eq!(report.updated, 0);
    assert_eq!(service.calls(PromptKind::Corrections), 2);
}

#[tokio::test]
async fn test_validator_writes_corrections() {
    let pool = memory_db().await;
    insert(&pool, Language::Pl, &["kot", "pies"]).await;
    let service = Arc::new(ScriptedService::new().with_correction(capitalize_word));

    let report = Validator::new(pool.clone(), generator(&service))
        .run(&validation(false))
        .await
        .unwrap();

    assert_eq!(report.changed, 2);
    assert_eq!(report.updated, 2);
    let words: Vec<String> = vocabulary::words_by_type(&pool, Language::Pl, "noun")
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.word)
        .collect();
    assert_eq!(words, vec!["Kot", "Pies"]);
}

#[tokio::test]
async fn test_validator_dry_run_leaves_rows() {
    let pool = memory_db().await;
    insert(&pool, Language::Pl, &["kot"]).await;
    let service = Arc::new(ScriptedService::new().with_correction(capitalize_word));

    let report = Validator::new(pool.clone(), generator(&service))
        .run(&validation(true))
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.changed, 1);
    assert_eq!(report.updated, 0);
    let stored = vocabulary::words_by_type(&pool, Language::Pl, "noun").await.unwrap();
    assert_eq!(stored[0].word, "kot");
}

#[tokio::test]
async fn test_validator_failed_batch_is_counted() {
    let pool = memory_db().await;
    insert(&pool, Language::Pl, &["kot", "pies", "ryba"]).await;
    let service = Arc::new(ScriptedService::new().with_correction(capitalize_word));
    service.fail_next(PromptKind::Corrections, 1);

    let report = Validator::new(pool.clone(), generator(&service))
        .run(&validation(false))
        .await
        .unwrap();

    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.updated, 1);
}
