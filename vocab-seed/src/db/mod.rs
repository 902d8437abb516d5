//! Database access for vocab-seed
//!
//! Table and pool setup live in `vocab_common::db`; this module holds the
//! queries the pipeline runs against them.

pub mod lease;
pub mod settings;
pub mod translations;
pub mod vocabulary;

pub use lease::{Lease, LeaseStatus, SeedLock, SEED_LOCK_NAME};
