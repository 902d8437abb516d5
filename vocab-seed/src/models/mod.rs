//! Data models for the seeding pipeline
//!
//! - Vocabulary rows and generated candidates
//! - Job configuration and failure policy
//! - Job and validation reports

pub mod job;
pub mod report;
pub mod word;

pub use job::{GenerationJobOptions, SeedMode, UnitFailurePolicy, ValidationOptions, MAX_TOTAL_WORDS};
pub use report::{JobRecord, JobState, SeedReport, ValidationReport};
pub use word::{Connection, CorrectedWord, NewWord, VocabularyWord, WordRef};
