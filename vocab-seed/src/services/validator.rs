//! Field-level quality pass over stored words
//!
//! Rows of one language and type go to the generation service in batches
//! with a correction instruction. Only corrections that differ from the
//! stored row are written. A batch whose request fails is left unchanged.

use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use vocab_common::Result;

use super::pacing::Pacer;
use super::word_generator::WordGenerator;
use crate::db::vocabulary;
use crate::models::{ValidationOptions, ValidationReport, VocabularyWord};

pub struct Validator {
    pool: SqlitePool,
    generator: WordGenerator,
}

impl Validator {
    pub fn new(pool: SqlitePool, generator: WordGenerator) -> Self {
        Self { pool, generator }
    }

    pub async fn run(&self, options: &ValidationOptions) -> Result<ValidationReport> {
        options.validate()?;
        let lang = options.language;

        let words = vocabulary::words_by_type(&self.pool, lang, &options.word_type).await?;
        let batches: Vec<&[VocabularyWord]> = words.chunks(options.batch_size).collect();
        let pacer = Pacer::from_millis(options.delay_ms);

        info!(
            language = %lang,
            word_type = %options.word_type,
            rows = words.len(),
            batches = batches.len(),
            dry_run = options.dry_run,
            "Validation started"
        );

        let mut report = ValidationReport {
            dry_run: options.dry_run,
            ..Default::default()
        };

        for (index, batch) in batches.iter().enumerate() {
            report.checked += batch.len();

            match self.generator.correct_words(lang, batch).await {
                Ok(corrections) => {
                    let originals: HashMap<i64, &VocabularyWord> = batch.iter().map(|w| (w.id, w)).collect();

                    for corrected in corrections {
                        let Some(original) = originals.get(&corrected.id) else {
                            continue;
                        };
                        if !corrected.differs_from(original) {
                            continue;
                        }
                        if !lang.accepts_word_type(&corrected.word_type) {
                            warn!(
                                id = corrected.id,
                                word_type = %corrected.word_type,
                                "Correction has an invalid type, skipped"
                            );
                            continue;
                        }

                        report.changed += 1;
                        if options.dry_run {
                            info!(
                                id = corrected.id,
                                before = %original.word,
                                after = %corrected.word,
                                "Would update word"
                            );
                            continue;
                        }

                        match vocabulary::update_word(&self.pool, lang, &corrected).await {
                            Ok(true) => {
                                report.updated += 1;
                                debug!(id = corrected.id, word = %corrected.word, "Word updated");
                            }
                            Ok(false) => warn!(id = corrected.id, "Word disappeared before update"),
                            Err(e) => warn!(id = corrected.id, error = %e, "Word update failed"),
                        }
                    }
                }
                Err(e) => {
                    report.failed_batches += 1;
                    warn!(batch = index + 1, error = %e, "Validation batch failed, rows left unchanged");
                }
            }

            pacer.between(index + 1 < batches.len()).await;
        }

        info!(
            checked = report.checked,
            changed = report.changed,
            updated = report.updated,
            failed_batches = report.failed_batches,
            "Validation finished"
        );
        Ok(report)
    }
}
