//! Typed requests on top of a [`GenerationService`]
//!
//! Each call builds an instruction, sends it, deserializes the returned
//! records and drops the ones that break the language's field rules. A call
//! that leaves nothing usable fails with [`GenerationError::Empty`].

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use vocab_common::Language;

use super::generation_client::{GenerationError, GenerationService, PromptKind};
use super::prompts::{self, SourceWord, WordRequest};
use crate::models::{Connection, CorrectedWord, NewWord, VocabularyWord, WordRef};

/// Word, translation, connection and correction requests
#[derive(Clone)]
pub struct WordGenerator {
    service: Arc<dyn GenerationService>,
}

impl WordGenerator {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self { service }
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// New candidate words for one unit of work
    pub async fn generate_words(&self, request: &WordRequest<'_>) -> Result<Vec<NewWord>, GenerationError> {
        let prompt = prompts::words_prompt(request);
        let items = self.service.generate(&prompt).await?;
        let words = keep_valid_words(parse_records(items, prompt.kind), request.language);
        non_empty(words)
    }

    /// Translations of already-persisted source words
    pub async fn translate_words(
        &self,
        source: Language,
        target: Language,
        words: &[SourceWord<'_>],
    ) -> Result<Vec<NewWord>, GenerationError> {
        let prompt = prompts::translations_prompt(source, target, words);
        let items = self.service.generate(&prompt).await?;
        let translated = keep_valid_words(parse_records(items, prompt.kind), target);
        non_empty(translated)
    }

    /// Semantic links between two persisted word lists
    ///
    /// Returned pairs are oriented (source id, target id). Pairs naming ids
    /// outside the two lists and repeated pairs are dropped; words the
    /// service left unconnected are logged.
    pub async fn connect_words(
        &self,
        source_lang: Language,
        target_lang: Language,
        source: &[WordRef],
        target: &[WordRef],
    ) -> Result<Vec<Connection>, GenerationError> {
        let prompt = prompts::connections_prompt(source_lang, target_lang, source, target);
        let items = self.service.generate(&prompt).await?;
        let connections = filter_connections(parse_records(items, prompt.kind), source, target);
        non_empty(connections)
    }

    /// Corrected versions of stored rows
    ///
    /// Records whose id was not in the request are dropped.
    pub async fn correct_words(
        &self,
        lang: Language,
        words: &[VocabularyWord],
    ) -> Result<Vec<CorrectedWord>, GenerationError> {
        let prompt = prompts::corrections_prompt(lang, words);
        let items = self.service.generate(&prompt).await?;

        let requested: HashSet<i64> = words.iter().map(|w| w.id).collect();
        let corrected = parse_records::<CorrectedWord>(items, prompt.kind)
            .into_iter()
            .filter(|c| {
                let known = requested.contains(&c.id);
                if !known {
                    warn!(id = c.id, "Correction for an id that was not requested, dropped");
                }
                known
            })
            .collect();
        non_empty(corrected)
    }
}

fn non_empty<T>(records: Vec<T>) -> Result<Vec<T>, GenerationError> {
    if records.is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(records)
    }
}

fn parse_records<T: DeserializeOwned>(items: Vec<Value>, kind: PromptKind) -> Vec<T> {
    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(kind = ?kind, error = %e, "Malformed record dropped");
                None
            }
        })
        .collect();

    debug!(kind = ?kind, received = total, parsed = parsed.len(), "Parsed generation records");
    parsed
}

/// Drop records breaking field rules and repeats within the batch
fn keep_valid_words(words: Vec<NewWord>, lang: Language) -> Vec<NewWord> {
    let mut seen = HashSet::new();
    words
        .into_iter()
        .filter(|word| match word.validate(lang) {
            Ok(()) => seen.insert(word.word.trim().to_lowercase()),
            Err(reason) => {
                warn!(language = %lang, word = %word.word, reason = %reason, "Invalid word dropped");
                false
            }
        })
        .collect()
}

fn filter_connections(connections: Vec<Connection>, source: &[WordRef], target: &[WordRef]) -> Vec<Connection> {
    let source_ids: HashSet<i64> = source.iter().map(|w| w.id).collect();
    let target_ids: HashSet<i64> = target.iter().map(|w| w.id).collect();
    let mut seen = HashSet::new();

    let kept: Vec<Connection> = connections
        .into_iter()
        .filter(|c| {
            if !source_ids.contains(&c.word_id1) || !target_ids.contains(&c.word_id2) {
                warn!(word_id1 = c.word_id1, word_id2 = c.word_id2, "Connection with unknown id dropped");
                return false;
            }
            seen.insert(*c)
        })
        .collect();

    let linked_source: HashSet<i64> = kept.iter().map(|c| c.word_id1).collect();
    let linked_target: HashSet<i64> = kept.iter().map(|c| c.word_id2).collect();
    let unlinked: Vec<&str> = source
        .iter()
        .filter(|w| !linked_source.contains(&w.id))
        .chain(target.iter().filter(|w| !linked_target.contains(&w.id)))
        .map(|w| w.word.as_str())
        .collect();
    if !unlinked.is_empty() {
        warn!(count = unlinked.len(), words = ?unlinked, "Words left without a connection");
    }

    kept
}
