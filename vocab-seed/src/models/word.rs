//! Vocabulary records
//!
//! Ids only exist after insertion: the generation service receives and
//! returns ids for persisted words but never invents new ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vocab_common::{Language, Level};

/// Persisted vocabulary row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyWord {
    pub id: i64,
    pub word: String,
    pub example: String,
    #[serde(rename = "type")]
    pub word_type: String,
    pub level: Level,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Word candidate awaiting insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWord {
    pub word: String,
    pub example: String,
    #[serde(rename = "type")]
    pub word_type: String,
    pub level: Level,
    #[serde(default)]
    pub comment: Option<String>,
}

impl NewWord {
    /// Check the record against the language's field rules
    pub fn validate(&self, lang: Language) -> Result<(), String> {
        if self.word.trim().is_empty() {
            return Err("empty word".to_string());
        }
        if !lang.accepts_word_type(&self.word_type) {
            return Err(format!(
                "'{}' is not a {} word type",
                self.word_type,
                lang.name()
            ));
        }
        Ok(())
    }
}

/// Id and surface form of a persisted word
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordRef {
    pub id: i64,
    pub word: String,
}

/// Translation link between two persisted words
///
/// Produced oriented as (source id, target id); the store re-orients to
/// the table's `word_id1`/`word_id2` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub word_id1: i64,
    pub word_id2: i64,
}

impl Connection {
    pub fn reversed(self) -> Self {
        Self {
            word_id1: self.word_id2,
            word_id2: self.word_id1,
        }
    }
}

/// Corrected version of an existing row returned by the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedWord {
    pub id: i64,
    pub word: String,
    pub example: String,
    #[serde(rename = "type")]
    pub word_type: String,
    pub level: Level,
    #[serde(default)]
    pub comment: Option<String>,
}

impl CorrectedWord {
    /// True when any field differs from `original`
    ///
    /// A missing comment and an empty comment are the same value.
    pub fn differs_from(&self, original: &VocabularyWord) -> bool {
        fn norm(comment: &Option<String>) -> &str {
            comment.as_deref().map(str::trim).unwrap_or("")
        }

        self.word != original.word
            || self.example != original.example
            || self.word_type != original.word_type
            || self.level != original.level
            || norm(&self.comment) != norm(&original.comment)
    }
}
