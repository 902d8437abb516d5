//! Common error types for the vocabulary services

use thiserror::Error;

/// Common result type for vocabulary operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the vocabulary crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Language code outside the supported set
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// No translation table is registered for this pair
    #[error("Translation table not found for language pair {0}_{1}")]
    UnsupportedLanguagePair(String, String),

    /// Seed lease is held by another job
    #[error("Seed lock '{name}' is held by {owner}")]
    Locked { name: String, owner: String },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
