//! Seeding job configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vocab_common::{Error, Language, Level, Result};

/// Upper bound on words requested by one job
pub const MAX_TOTAL_WORDS: usize = 1_000_000;

/// How a seeding job enumerates its units of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    /// One unit per shuffled two-letter combination
    Alphabetical,
    /// `ceil(total / batch_size)` quantity batches
    Topic,
}

/// What the scheduler does when one unit fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFailurePolicy {
    /// Log and move on to the next unit
    #[default]
    Skip,
    /// Fail the whole job with the unit's error
    Abort,
    /// Re-run the unit up to n more times, then skip it
    Retry(u32),
}

impl fmt::Display for UnitFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitFailurePolicy::Skip => f.write_str("skip"),
            UnitFailurePolicy::Abort => f.write_str("abort"),
            UnitFailurePolicy::Retry(n) => write!(f, "retry({})", n),
        }
    }
}

impl FromStr for UnitFailurePolicy {
    type Err = Error;

    /// `skip`, `abort`, `retry(n)` or `retry:n`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "skip" => return Ok(UnitFailurePolicy::Skip),
            "abort" => return Ok(UnitFailurePolicy::Abort),
            _ => {}
        }

        let count = s
            .strip_prefix("retry(")
            .and_then(|rest| rest.strip_suffix(')'))
            .or_else(|| s.strip_prefix("retry:"))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown failure policy: {}", s)))?;

        count
            .trim()
            .parse()
            .map(UnitFailurePolicy::Retry)
            .map_err(|_| Error::InvalidInput(format!("Invalid retry count in '{}'", s)))
    }
}

/// Job configuration accepted at the trigger boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJobOptions {
    /// Language the words are generated in
    pub language: Language,

    /// Language the words are translated into
    pub translation_language: Language,

    /// Total number of words to generate
    pub total: usize,

    /// Words per generation request
    pub batch_size: usize,

    /// Pause between units, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,

    /// Fixed CEFR level; random per batch when unset
    #[serde(default)]
    pub level: Option<Level>,

    /// Fixed word type
    #[serde(default)]
    pub word_type: Option<String>,

    /// Pick a random word type per batch (ignored when `word_type` is set)
    #[serde(default)]
    pub random_word_type: bool,

    /// Optional theme for topic mode
    #[serde(default)]
    pub topic: Option<String>,

    /// Use the alphabetical letter-pair scheduler
    #[serde(default)]
    pub alphabetical: bool,

    /// Log each generated word at info level
    #[serde(default)]
    pub log_verbose: bool,

    /// Per-unit failure handling
    #[serde(default)]
    pub on_unit_failure: UnitFailurePolicy,
}

impl GenerationJobOptions {
    /// Minimal options; everything else defaulted
    pub fn new(language: Language, translation_language: Language, total: usize, batch_size: usize) -> Self {
        Self {
            language,
            translation_language,
            total,
            batch_size,
            delay_ms: 0,
            level: None,
            word_type: None,
            random_word_type: false,
            topic: None,
            alphabetical: false,
            log_verbose: false,
            on_unit_failure: UnitFailurePolicy::Skip,
        }
    }

    pub fn mode(&self) -> SeedMode {
        if self.alphabetical {
            SeedMode::Alphabetical
        } else {
            SeedMode::Topic
        }
    }

    /// Number of topic-mode batches
    pub fn batch_count(&self) -> usize {
        if self.batch_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.batch_size)
    }

    /// Reject configurations no job can run with
    pub fn validate(&self) -> Result<()> {
        if self.total == 0 {
            return Err(Error::InvalidInput("total must be greater than 0".to_string()));
        }
        if self.total > MAX_TOTAL_WORDS {
            return Err(Error::InvalidInput(format!(
                "total must be at most {} (got {})",
                MAX_TOTAL_WORDS, self.total
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidInput("batch_size must be greater than 0".to_string()));
        }
        if self.language == self.translation_language {
            return Err(Error::InvalidInput(format!(
                "language and translation_language are both {}",
                self.language
            )));
        }
        if let Some(word_type) = &self.word_type {
            if !self.language.accepts_word_type(word_type) {
                return Err(Error::InvalidInput(format!(
                    "'{}' is not a {} word type (expected one of: {})",
                    word_type,
                    self.language.name(),
                    self.language.word_types().join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Validator pass configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOptions {
    pub language: Language,

    /// Only rows of this grammatical type are checked
    pub word_type: String,

    /// Rows per generation request
    #[serde(default = "default_validation_batch")]
    pub batch_size: usize,

    /// Pause between batches, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,

    /// Log intended changes without writing them
    #[serde(default)]
    pub dry_run: bool,
}

fn default_validation_batch() -> usize {
    20
}

impl ValidationOptions {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidInput("batch_size must be greater than 0".to_string()));
        }
        if !self.language.accepts_word_type(&self.word_type) {
            return Err(Error::InvalidInput(format!(
                "'{}' is not a {} word type",
                self.word_type,
                self.language.name()
            )));
        }
        Ok(())
    }
}
