//! Seeding pipeline services
//!
//! - Generation service boundary and prompts
//! - Word generator (words, translations, connections, corrections)
//! - Persistence & linking of one unit
//! - Scheduler driving units for a job
//! - Maintenance passes and the validator

pub mod generation_client;
pub mod linker;
pub mod maintenance;
pub mod pacing;
pub mod prompts;
pub mod scheduler;
pub mod validator;
pub mod word_generator;

pub use generation_client::{
    GenerationError, GenerationPrompt, GenerationService, GenerationSettings, OpenAiCompatibleClient, PromptKind,
};
pub use linker::{Linker, Stage, UnitError, UnitOutcome};
pub use maintenance::{dedup_language, remove_orphans};
pub use scheduler::{SeedError, Seeder, TopicUnit, TopicUnits, UnitPlan, UnitSchedule, EXCLUSION_LIMIT};
pub use validator::Validator;
pub use word_generator::WordGenerator;
