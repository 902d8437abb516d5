//! Test helpers shared by the vocab-seed integration tests
//!
//! [`ScriptedService`] stands in for the generation service. It answers each
//! prompt kind from the instruction text alone (ids and words listed in the
//! prompt), so a whole seeding job can run without a network.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vocab_common::db::init_memory_database;
use vocab_common::TableRegistry;
use vocab_seed::services::{GenerationError, GenerationPrompt, GenerationService, PromptKind, WordGenerator};

type Correction = fn(&mut Value);

/// Deterministic generation service driven by the prompt text
#[derive(Default)]
pub struct ScriptedService {
    sequence: AtomicUsize,
    calls: Mutex<HashMap<PromptKind, usize>>,
    failures: Mutex<HashMap<PromptKind, usize>>,
    correction: Option<Correction>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `correction` to every entry echoed back by the validator prompt
    pub fn with_correction(mut self, correction: Correction) -> Self {
        self.correction = Some(correction);
        self
    }

    /// Fail the next `count` requests of `kind`
    pub fn fail_next(&self, kind: PromptKind, count: usize) {
        *self.failures.lock().unwrap().entry(kind).or_default() += count;
    }

    pub fn calls(&self, kind: PromptKind) -> usize {
        self.calls.lock().unwrap().get(&kind).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn should_fail(&self, kind: PromptKind) -> bool {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&kind) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn next_word(&self, stem: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!("{}{}", stem, n)
    }

    fn words(&self, prompt: &GenerationPrompt) -> Vec<Value> {
        let quantity = prompt
            .instruction
            .split_whitespace()
            .nth(1)
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(1);
        let stem = letters(&prompt.instruction).unwrap_or_else(|| "w".to_string());
        let word_type = first_type(prompt);

        (0..quantity)
            .map(|_| {
                let word = self.next_word(&stem);
                record(&word, &word_type)
            })
            .collect()
    }

    fn translations(&self, prompt: &GenerationPrompt) -> Vec<Value> {
        let word_type = first_type(prompt);
        listed(&prompt.instruction, "Source words")
            .into_iter()
            .map(|(_, word)| record(&self.next_word(&format!("{}-t", word)), &word_type))
            .collect()
    }

    fn connections(&self, prompt: &GenerationPrompt) -> Vec<Value> {
        let sections: Vec<&str> = prompt.instruction.split("words (id | word):").skip(1).collect();
        let source = sections.first().map(|s| ids(s)).unwrap_or_default();
        let target = sections.get(1).map(|s| ids(s)).unwrap_or_default();

        source
            .iter()
            .zip(&target)
            .map(|(a, b)| json!({"wordId1": a, "wordId2": b}))
            .collect()
    }

    fn corrections(&self, prompt: &GenerationPrompt) -> Vec<Value> {
        let Some((_, entries)) = prompt.instruction.split_once("Entries (JSON):\n") else {
            return Vec::new();
        };
        entries
            .lines()
            .take_while(|line| !line.starts_with("Field rules"))
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .map(|mut entry| {
                if let Some(correct) = self.correction {
                    correct(&mut entry);
                }
                entry
            })
            .collect()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &GenerationPrompt) -> Result<Vec<Value>, GenerationError> {
        *self.calls.lock().unwrap().entry(prompt.kind).or_default() += 1;
        if self.should_fail(prompt.kind) {
            return Err(GenerationError::Http(503, "scripted failure".to_string()));
        }

        Ok(match prompt.kind {
            PromptKind::Words => self.words(prompt),
            PromptKind::Translations => self.translations(prompt),
            PromptKind::Connections => self.connections(prompt),
            PromptKind::Corrections => self.corrections(prompt),
        })
    }
}

fn record(word: &str, word_type: &str) -> Value {
    json!({
        "word": word,
        "example": format!("Example with {}.", word),
        "type": word_type,
        "level": "A1",
        "comment": null,
    })
}

/// First word type allowed by the prompt's item schema
fn first_type(prompt: &GenerationPrompt) -> String {
    prompt.item_schema["properties"]["type"]["enum"][0]
        .as_str()
        .unwrap_or("noun")
        .to_string()
}

/// Letter sequence required by an alphabetical words prompt
fn letters(instruction: &str) -> Option<String> {
    let (_, rest) = instruction.split_once("letter sequence \"")?;
    rest.split_once('"').map(|(letters, _)| letters.to_string())
}

/// `id | word | ...` rows following the line that starts with `heading`
fn listed(instruction: &str, heading: &str) -> Vec<(i64, String)> {
    instruction
        .lines()
        .skip_while(|line| !line.starts_with(heading))
        .skip(1)
        .map_while(|line| {
            let mut parts = line.split(" | ");
            let id = parts.next()?.trim().parse().ok()?;
            let word = parts.next()?.trim().to_string();
            Some((id, word))
        })
        .collect()
}

fn ids(section: &str) -> Vec<i64> {
    section
        .lines()
        .filter_map(|line| line.split(" | ").next()?.trim().parse().ok())
        .collect()
}

/// In-memory database with every language pair registered
pub async fn memory_db() -> SqlitePool {
    init_memory_database(&TableRegistry::all_pairs())
        .await
        .expect("Failed to create in-memory database")
}

pub fn generator(service: &Arc<ScriptedService>) -> WordGenerator {
    WordGenerator::new(service.clone())
}
