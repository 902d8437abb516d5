//! Instructions and output schemas for the four generation requests
//!
//! Schemas are strict: every property is required and no extra properties
//! are allowed, so a nullable field is typed `["string", "null"]`.

use serde_json::{json, Value};
use std::fmt::Write as _;
use vocab_common::{Language, Level};

use super::generation_client::{GenerationPrompt, PromptKind};
use crate::models::{VocabularyWord, WordRef};

const SYSTEM: &str = "You are a lexicographer building vocabulary for language learners. \
Answer only with data matching the provided JSON schema.";

/// Parameters of one word-generation request
#[derive(Debug, Clone)]
pub struct WordRequest<'a> {
    pub language: Language,
    pub quantity: usize,
    pub level: Option<Level>,
    pub word_type: Option<&'a str>,
    /// Letter combination every word must contain
    pub letters: Option<&'a str>,
    pub topic: Option<&'a str>,
    /// Existing words to avoid
    pub exclude: &'a [String],
}

/// Source word handed to the translation request
#[derive(Debug, Clone)]
pub struct SourceWord<'a> {
    pub id: i64,
    pub word: &'a str,
    pub word_type: &'a str,
    pub level: Level,
    pub example: &'a str,
}

fn level_schema() -> Value {
    json!({
        "type": "string",
        "enum": Level::ALL.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
    })
}

fn word_properties(lang: Language) -> serde_json::Map<String, Value> {
    let mut properties = serde_json::Map::new();
    properties.insert("word".into(), json!({"type": "string"}));
    properties.insert("example".into(), json!({"type": "string"}));
    properties.insert("type".into(), json!({"type": "string", "enum": lang.word_types()}));
    properties.insert("level".into(), level_schema());
    properties.insert("comment".into(), json!({"type": ["string", "null"]}));
    properties
}

/// Schema of one vocabulary record in `lang`
pub fn word_schema(lang: Language) -> Value {
    json!({
        "type": "object",
        "properties": word_properties(lang),
        "required": ["word", "example", "type", "level", "comment"],
        "additionalProperties": false,
    })
}

/// Schema of one corrected record, which keeps its id
pub fn corrected_word_schema(lang: Language) -> Value {
    let mut properties = word_properties(lang);
    properties.insert("id".into(), json!({"type": "integer"}));
    json!({
        "type": "object",
        "properties": properties,
        "required": ["id", "word", "example", "type", "level", "comment"],
        "additionalProperties": false,
    })
}

pub fn connection_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "wordId1": {"type": "integer"},
            "wordId2": {"type": "integer"},
        },
        "required": ["wordId1", "wordId2"],
        "additionalProperties": false,
    })
}

fn field_rules(lang: Language) -> String {
    format!(
        "Field rules:\n\
         - word: the dictionary base form in {name}; nouns without articles unless the article is part of the lemma\n\
         - example: one natural sentence in {name} using the word\n\
         - type: one of {types}\n\
         - level: CEFR level, one of A1, A2, B1, B2, C1, C2\n\
         - comment: a short usage note written only in {name}, or null\n",
        name = lang.name(),
        types = lang.word_types().join(", "),
    )
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}", heading);
    let _ = writeln!(out, "{}", items.join(", "));
}

/// Instruction for new vocabulary
pub fn words_prompt(request: &WordRequest<'_>) -> GenerationPrompt {
    let lang = request.language;
    let mut instruction = format!(
        "Generate {} distinct {} vocabulary words.\n",
        request.quantity,
        lang.name()
    );

    if let Some(letters) = request.letters {
        let _ = writeln!(
            instruction,
            "Every word must contain the letter sequence \"{}\" (in any position).",
            letters
        );
    }
    if let Some(level) = request.level {
        let _ = writeln!(instruction, "All words must be CEFR level {}.", level);
    }
    if let Some(word_type) = request.word_type {
        let _ = writeln!(instruction, "All words must be of type \"{}\".", word_type);
    }
    if let Some(topic) = request.topic {
        let _ = writeln!(instruction, "All words must relate to the topic \"{}\".", topic);
    }
    instruction.push_str("Do not repeat a word within the list.\n");
    push_list(
        &mut instruction,
        "These words already exist; do not generate any of them:",
        request.exclude,
    );
    instruction.push_str(&field_rules(lang));

    GenerationPrompt {
        kind: PromptKind::Words,
        system: SYSTEM.to_string(),
        instruction,
        schema_name: "vocabulary_words",
        item_schema: word_schema(lang),
    }
}

/// Instruction for translating persisted words into `target`
pub fn translations_prompt(source: Language, target: Language, words: &[SourceWord<'_>]) -> GenerationPrompt {
    let mut instruction = format!(
        "Translate each of the following {} words into {}.\n\
         Return one {} entry per source word, in the same order.\n\
         Preserve the meaning, part of speech and difficulty of each source word.\n\
         Write the example and comment only in {}. Do not copy the source word into the comment.\n\
         Source words (id | word | type | level | example):\n",
        source.name(),
        target.name(),
        target.name(),
        target.name(),
    );
    for word in words {
        let _ = writeln!(
            instruction,
            "{} | {} | {} | {} | {}",
            word.id, word.word, word.word_type, word.level, word.example
        );
    }
    instruction.push_str(&field_rules(target));

    GenerationPrompt {
        kind: PromptKind::Translations,
        system: SYSTEM.to_string(),
        instruction,
        schema_name: "translated_words",
        item_schema: word_schema(target),
    }
}

/// Instruction for pairing source words with their translations
pub fn connections_prompt(
    source_lang: Language,
    target_lang: Language,
    source: &[WordRef],
    target: &[WordRef],
) -> GenerationPrompt {
    let mut instruction = format!(
        "Match {} words with the {} words that translate them.\n\
         Return pairs where wordId1 is the id of a {} word and wordId2 the id of a {} word.\n\
         Every word in both lists must appear in at least one pair.\n\
         A word may have several translations. Never repeat a pair and never include the same pair reversed.\n\
         Use only the ids listed below.\n",
        source_lang.name(),
        target_lang.name(),
        source_lang.name(),
        target_lang.name(),
    );

    let _ = writeln!(instruction, "{} words (id | word):", source_lang.name());
    for word in source {
        let _ = writeln!(instruction, "{} | {}", word.id, word.word);
    }
    let _ = writeln!(instruction, "{} words (id | word):", target_lang.name());
    for word in target {
        let _ = writeln!(instruction, "{} | {}", word.id, word.word);
    }

    GenerationPrompt {
        kind: PromptKind::Connections,
        system: SYSTEM.to_string(),
        instruction,
        schema_name: "word_connections",
        item_schema: connection_schema(),
    }
}

/// Instruction for checking and fixing stored rows
pub fn corrections_prompt(lang: Language, words: &[VocabularyWord]) -> GenerationPrompt {
    let mut instruction = format!(
        "Review the following {} vocabulary entries and correct any mistakes.\n\
         Fix the base form of the word, its grammatical type, its CEFR level, \
         the naturalness of the example sentence and the quality of the comment.\n\
         Never change what the word means. Keep every id unchanged and return every entry, \
         unchanged if it is already correct.\n\
         Entries (JSON):\n",
        lang.name()
    );

    for word in words {
        let entry = json!({
            "id": word.id,
            "word": word.word,
            "example": word.example,
            "type": word.word_type,
            "level": word.level,
            "comment": word.comment,
        });
        let _ = writeln!(instruction, "{}", entry);
    }
    instruction.push_str(&field_rules(lang));

    GenerationPrompt {
        kind: PromptKind::Corrections,
        system: SYSTEM.to_string(),
        instruction,
        schema_name: "corrected_words",
        item_schema: corrected_word_schema(lang),
    }
}
