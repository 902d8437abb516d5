//! # Vocab Common Library
//!
//! Shared code for the vocabulary seeding service and its tooling:
//! - Error type
//! - Bootstrap configuration loading
//! - Supported languages, levels and translation table registry
//! - Database pool initialization and schema
//! - Trigger authorization
//! - Timestamp helpers

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod language;
pub mod time;

pub use error::{Error, Result};
pub use language::{Language, LanguagePair, Level, TableRegistry, TranslationTable};
