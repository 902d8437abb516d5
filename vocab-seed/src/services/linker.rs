//! Persistence and linking of one unit of work
//!
//! generate → insert source words → translate → insert target words →
//! connect → insert links. Each step runs only if the previous one produced
//! something, and a unit that stores no new link fails. Rows inserted before a later step fails stay in place without
//! links; orphan removal cleans them up.

use sqlx::SqlitePool;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};
use vocab_common::{Language, TranslationTable};

use super::generation_client::GenerationError;
use super::prompts::{SourceWord, WordRequest};
use super::word_generator::WordGenerator;
use crate::db::{translations, vocabulary};
use crate::models::{NewWord, WordRef};

/// Step of the linking sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Words,
    Translations,
    Connections,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Words => "word generation",
            Stage::Translations => "translation",
            Stage::Connections => "connection",
        })
    }
}

/// Why a unit did not complete
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("{stage} failed: {source}")]
    Generation {
        stage: Stage,
        #[source]
        source: GenerationError,
    },

    /// The link table took none of the connections
    #[error("None of {0} connections produced a new link")]
    Unlinked(usize),

    #[error("Store error: {0}")]
    Store(#[from] vocab_common::Error),
}

fn failed_at(stage: Stage) -> impl FnOnce(GenerationError) -> UnitError {
    move |source| UnitError::Generation { stage, source }
}

/// Rows written by a completed unit
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub source: Vec<WordRef>,
    pub target: Vec<WordRef>,
    pub links: u64,
}

/// Runs units for one source/target language pair
pub struct Linker {
    pool: SqlitePool,
    generator: WordGenerator,
    table: TranslationTable,
    source: Language,
    target: Language,
    log_verbose: bool,
}

impl Linker {
    pub fn new(
        pool: SqlitePool,
        generator: WordGenerator,
        table: TranslationTable,
        source: Language,
        target: Language,
    ) -> Self {
        Self {
            pool,
            generator,
            table,
            source,
            target,
            log_verbose: false,
        }
    }

    pub fn verbose(mut self, log_verbose: bool) -> Self {
        self.log_verbose = log_verbose;
        self
    }

    pub async fn run_unit(&self, request: &WordRequest<'_>) -> Result<UnitOutcome, UnitError> {
        let mut words = self
            .generator
            .generate_words(request)
            .await
            .map_err(failed_at(Stage::Words))?;
        words.truncate(request.quantity);

        let source_refs = vocabulary::insert_words(&self.pool, self.source, &words).await?;
        self.log_words(self.source, &words);

        let source_words: Vec<SourceWord<'_>> = source_refs
            .iter()
            .zip(&words)
            .map(|(r, w)| SourceWord {
                id: r.id,
                word: &r.word,
                word_type: &w.word_type,
                level: w.level,
                example: &w.example,
            })
            .collect();

        let translated = self
            .generator
            .translate_words(self.source, self.target, &source_words)
            .await
            .map_err(failed_at(Stage::Translations))?;

        let target_refs = vocabulary::insert_words(&self.pool, self.target, &translated).await?;
        self.log_words(self.target, &translated);

        let connections = self
            .generator
            .connect_words(self.source, self.target, &source_refs, &target_refs)
            .await
            .map_err(failed_at(Stage::Connections))?;

        let links = translations::insert_links(&self.pool, &self.table, self.source, &connections).await?;
        if links == 0 {
            return Err(UnitError::Unlinked(connections.len()));
        }

        debug!(
            source = source_refs.len(),
            target = target_refs.len(),
            links,
            table = self.table.name(),
            "Unit linked"
        );

        Ok(UnitOutcome {
            source: source_refs,
            target: target_refs,
            links,
        })
    }

    fn log_words(&self, lang: Language, words: &[NewWord]) {
        for word in words {
            if self.log_verbose {
                info!(language = %lang, word = %word.word, word_type = %word.word_type, level = %word.level, "Inserted word");
            } else {
                debug!(language = %lang, word = %word.word, word_type = %word.word_type, level = %word.level, "Inserted word");
            }
        }
    }
}
