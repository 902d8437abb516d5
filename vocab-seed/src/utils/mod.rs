//! Utility modules for vocab-seed

pub mod db_retry;

pub use db_retry::{retry_on_busy, DEFAULT_MAX_WAIT_MS};
