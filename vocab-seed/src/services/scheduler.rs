//! Seeding job scheduler
//!
//! Enumerates the units of a job, then runs them strictly in order with a
//! pause between consecutive units:
//!
//! - alphabetical mode: every ordered two-letter combination of the source
//!   alphabet, shuffled; stops once the requested total is reached or the
//!   combinations run out
//! - topic mode: `ceil(total / batch_size)` batches, each with a fixed or
//!   random level and an optional fixed or random word type
//!
//! A failed unit is handled by the job's [`UnitFailurePolicy`]. After the
//! loop both languages are deduplicated.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info, warn};
use vocab_common::{time, Language, Level, TableRegistry};

use super::linker::{Linker, UnitError, UnitOutcome};
use super::maintenance;
use super::pacing::Pacer;
use super::prompts::WordRequest;
use super::word_generator::WordGenerator;
use crate::db::vocabulary;
use crate::models::{GenerationJobOptions, SeedMode, SeedReport, UnitFailurePolicy};

/// Cap on the number of existing words sent as an exclusion list
pub const EXCLUSION_LIMIT: usize = 300;

/// Job-level failure
#[derive(Debug, Error)]
pub enum SeedError {
    /// Bad options or an unregistered language pair; never retried
    #[error("Configuration error: {0}")]
    Config(vocab_common::Error),

    #[error("Store error: {0}")]
    Store(vocab_common::Error),

    /// A unit failed under the abort policy
    #[error("Unit {unit} failed: {source}")]
    Unit {
        unit: String,
        #[source]
        source: UnitError,
    },
}

/// One topic-mode batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicUnit {
    pub index: usize,
    pub quantity: usize,
    pub level: Level,
    pub word_type: Option<String>,
}

/// Planned unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitPlan {
    Letters(String),
    Topic(TopicUnit),
}

impl UnitPlan {
    fn label(&self, count: usize) -> String {
        match self {
            UnitPlan::Letters(letters) => format!("letters '{}'", letters),
            UnitPlan::Topic(unit) => format!("batch {}/{}", unit.index + 1, count),
        }
    }
}

/// Every ordered pair of letters (doubles included), shuffled
pub fn letter_pairs(lang: Language, rng: &mut StdRng) -> Vec<String> {
    let alphabet = lang.alphabet();
    let mut pairs = Vec::with_capacity(alphabet.len() * alphabet.len());
    for a in alphabet {
        for b in alphabet {
            pairs.push([*a, *b].iter().collect::<String>());
        }
    }
    pairs.shuffle(rng);
    pairs
}

/// Topic-mode batches, drawn one at a time as the job reaches them
///
/// The last batch takes the remainder. Level and word type are picked when
/// a batch is drawn.
pub struct TopicUnits<'a> {
    options: &'a GenerationJobOptions,
    rng: StdRng,
    next: usize,
    count: usize,
}

impl<'a> TopicUnits<'a> {
    pub fn new(options: &'a GenerationJobOptions, rng: StdRng) -> Self {
        Self {
            options,
            rng,
            next: 0,
            count: options.batch_count(),
        }
    }
}

impl Iterator for TopicUnits<'_> {
    type Item = TopicUnit;

    fn next(&mut self) -> Option<TopicUnit> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let options = self.options;
        let quantity = if index + 1 == self.count {
            options.total - options.batch_size * index
        } else {
            options.batch_size
        };

        let level = match options.level {
            Some(level) => level,
            None => *Level::ALL.choose(&mut self.rng).unwrap_or(&Level::A1),
        };

        let word_type = match &options.word_type {
            Some(word_type) => Some(word_type.clone()),
            None if options.random_word_type => options
                .language
                .word_types()
                .choose(&mut self.rng)
                .map(|t| t.to_string()),
            None => None,
        };

        Some(TopicUnit {
            index,
            quantity,
            level,
            word_type,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TopicUnits<'_> {}

/// Units of one job in run order
pub enum UnitSchedule<'a> {
    Letters(std::vec::IntoIter<String>),
    Topic(TopicUnits<'a>),
}

impl Iterator for UnitSchedule<'_> {
    type Item = UnitPlan;

    fn next(&mut self) -> Option<UnitPlan> {
        match self {
            UnitSchedule::Letters(pairs) => pairs.next().map(UnitPlan::Letters),
            UnitSchedule::Topic(units) => units.next().map(UnitPlan::Topic),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            UnitSchedule::Letters(pairs) => pairs.size_hint(),
            UnitSchedule::Topic(units) => units.size_hint(),
        }
    }
}

impl ExactSizeIterator for UnitSchedule<'_> {}

/// Runs seeding jobs against one database
pub struct Seeder {
    pool: SqlitePool,
    registry: TableRegistry,
    generator: WordGenerator,
    rng_seed: Option<u64>,
}

impl Seeder {
    pub fn new(pool: SqlitePool, registry: TableRegistry, generator: WordGenerator) -> Self {
        Self {
            pool,
            registry,
            generator,
            rng_seed: None,
        }
    }

    /// Deterministic shuffles and level picks
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Unit schedule for a job, without running it
    pub fn plan<'a>(&self, options: &'a GenerationJobOptions) -> UnitSchedule<'a> {
        let mut rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        match options.mode() {
            SeedMode::Alphabetical => {
                UnitSchedule::Letters(letter_pairs(options.language, &mut rng).into_iter())
            }
            SeedMode::Topic => UnitSchedule::Topic(TopicUnits::new(options, rng)),
        }
    }

    /// Run a whole job
    ///
    /// The caller is responsible for holding the seed lease.
    pub async fn run(&self, options: &GenerationJobOptions) -> Result<SeedReport, SeedError> {
        options.validate().map_err(SeedError::Config)?;
        let table = self
            .registry
            .translation_table(options.language, options.translation_language)
            .map_err(SeedError::Config)?;

        let started_at = time::now();
        let mode = options.mode();
        let units = self.plan(options);
        let unit_count = units.len();
        let pacer = Pacer::from_millis(options.delay_ms);
        let linker = Linker::new(
            self.pool.clone(),
            self.generator.clone(),
            table,
            options.language,
            options.translation_language,
        )
        .verbose(options.log_verbose);

        info!(
            mode = ?mode,
            language = %options.language,
            translation_language = %options.translation_language,
            total = options.total,
            batch_size = options.batch_size,
            units = unit_count,
            generator = self.generator.service_name(),
            "Seeding job started"
        );

        let mut generated = 0usize;
        let mut attempted = 0usize;
        let mut succeeded = 0usize;
        let mut failed = 0usize;

        for (position, unit) in units.enumerate() {
            if mode == SeedMode::Alphabetical && generated >= options.total {
                break;
            }

            let label = unit.label(unit_count);
            attempted += 1;

            match self.run_with_policy(&linker, options, &unit, generated, &label).await {
                Ok(outcome) => {
                    generated += outcome.source.len();
                    succeeded += 1;
                    info!(
                        unit = %label,
                        words = outcome.source.len(),
                        translations = outcome.target.len(),
                        links = outcome.links,
                        generated,
                        total = options.total,
                        "Unit complete"
                    );
                }
                Err(e) => {
                    failed += 1;
                    if options.on_unit_failure == UnitFailurePolicy::Abort {
                        error!(unit = %label, error = %e, "Unit failed, aborting job");
                        return Err(SeedError::Unit { unit: label, source: e });
                    }
                    warn!(unit = %label, error = %e, "Unit failed, skipping");
                }
            }

            let has_next = position + 1 < unit_count
                && (mode == SeedMode::Topic || generated < options.total);
            pacer.between(has_next).await;
        }

        let duplicates_removed_source =
            maintenance::dedup_language(&self.pool, &self.registry, options.language)
                .await
                .map_err(SeedError::Store)?;
        let duplicates_removed_target =
            maintenance::dedup_language(&self.pool, &self.registry, options.translation_language)
                .await
                .map_err(SeedError::Store)?;

        let report = SeedReport {
            mode,
            language: options.language,
            translation_language: options.translation_language,
            total_generated: generated,
            units_attempted: attempted,
            units_succeeded: succeeded,
            units_failed: failed,
            duplicates_removed_source,
            duplicates_removed_target,
            started_at,
            finished_at: time::now(),
        };

        info!(
            total_generated = report.total_generated,
            units_succeeded = report.units_succeeded,
            units_failed = report.units_failed,
            duplicates_removed_source,
            duplicates_removed_target,
            "Seeding job finished"
        );
        Ok(report)
    }

    async fn run_with_policy(
        &self,
        linker: &Linker,
        options: &GenerationJobOptions,
        unit: &UnitPlan,
        generated: usize,
        label: &str,
    ) -> Result<UnitOutcome, UnitError> {
        let retries = match options.on_unit_failure {
            UnitFailurePolicy::Retry(n) => n,
            UnitFailurePolicy::Skip | UnitFailurePolicy::Abort => 0,
        };

        let mut attempt = 0u32;
        loop {
            match self.run_unit(linker, options, unit, generated).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if attempt < retries => {
                    attempt += 1;
                    warn!(unit = %label, attempt, retries, error = %e, "Unit failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_unit(
        &self,
        linker: &Linker,
        options: &GenerationJobOptions,
        unit: &UnitPlan,
        generated: usize,
    ) -> Result<UnitOutcome, UnitError> {
        match unit {
            UnitPlan::Letters(letters) => {
                let exclude =
                    vocabulary::words_containing(&self.pool, options.language, letters, EXCLUSION_LIMIT)
                        .await?;
                let request = WordRequest {
                    language: options.language,
                    quantity: options.batch_size.min(options.total.saturating_sub(generated)),
                    level: options.level,
                    word_type: options.word_type.as_deref(),
                    letters: Some(letters.as_str()),
                    topic: options.topic.as_deref(),
                    exclude: &exclude,
                };
                linker.run_unit(&request).await
            }
            UnitPlan::Topic(topic) => {
                let exclude = vocabulary::recent_words(
                    &self.pool,
                    options.language,
                    topic.level,
                    topic.word_type.as_deref(),
                    EXCLUSION_LIMIT,
                )
                .await?;
                let request = WordRequest {
                    language: options.language,
                    quantity: topic.quantity,
                    level: Some(topic.level),
                    word_type: topic.word_type.as_deref(),
                    letters: None,
                    topic: options.topic.as_deref(),
                    exclude: &exclude,
                };
                linker.run_unit(&request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_pairs_cover_alphabet_squared() {
        let mut rng = StdRng::seed_from_u64(1);
        let pairs = letter_pairs(Language::En, &mut rng);
        assert_eq!(pairs.len(), 26 * 26);
        assert!(pairs.contains(&"aa".to_string()));
        assert!(pairs.contains(&"zq".to_string()));

        let mut sorted = pairs.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), pairs.len());
    }

    #[test]
    fn test_letter_pairs_are_shuffled_per_seed() {
        let a = letter_pairs(Language::Pl, &mut StdRng::seed_from_u64(1));
        let b = letter_pairs(Language::Pl, &mut StdRng::seed_from_u64(1));
        let c = letter_pairs(Language::Pl, &mut StdRng::seed_from_u64(2));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_topic_units_quantities() {
        let options = GenerationJobOptions::new(Language::Pl, Language::Ru, 100, 25);
        let units: Vec<TopicUnit> = TopicUnits::new(&options, StdRng::seed_from_u64(3)).collect();
        assert_eq!(units.len(), 4);
        assert!(units.iter().all(|u| u.quantity == 25));
        assert!(units.iter().all(|u| u.word_type.is_none()));

        let options = GenerationJobOptions::new(Language::Pl, Language::Ru, 55, 25);
        let units = TopicUnits::new(&options, StdRng::seed_from_u64(3));
        let quantities: Vec<usize> = units.map(|u| u.quantity).collect();
        assert_eq!(quantities, vec![25, 25, 5]);
    }

    #[test]
    fn test_topic_units_fixed_and_random_choices() {
        let mut options = GenerationJobOptions::new(Language::De, Language::En, 40, 10);
        options.level = Some(Level::B2);
        options.random_word_type = true;

        let units: Vec<TopicUnit> = TopicUnits::new(&options, StdRng::seed_from_u64(9)).collect();
        assert!(units.iter().all(|u| u.level == Level::B2));
        for unit in &units {
            let word_type = unit.word_type.as_deref().unwrap();
            assert!(Language::De.accepts_word_type(word_type));
        }

        options.word_type = Some("verb".to_string());
        let mut units = TopicUnits::new(&options, StdRng::seed_from_u64(9));
        assert!(units.all(|u| u.word_type.as_deref() == Some("verb")));
    }

    #[test]
    fn test_topic_units_are_drawn_lazily() {
        // No allocation proportional to the batch count
        let options = GenerationJobOptions::new(Language::Pl, Language::Ru, 1 << 40, 1);
        let mut units = TopicUnits::new(&options, StdRng::seed_from_u64(5));
        assert_eq!(units.len(), 1 << 40);

        let first = units.next().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.quantity, 1);
        assert_eq!(units.len(), (1 << 40) - 1);
    }
}
