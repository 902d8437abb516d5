//! Job outcome summaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vocab_common::Language;

use super::{GenerationJobOptions, SeedMode};

/// Result of a finished seeding job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedReport {
    pub mode: SeedMode,
    pub language: Language,
    pub translation_language: Language,
    /// Source words inserted by fully linked units
    pub total_generated: usize,
    pub units_attempted: usize,
    pub units_succeeded: usize,
    pub units_failed: usize,
    /// Rows removed by the closing dedup pass (source language)
    pub duplicates_removed_source: u64,
    /// Rows removed by the closing dedup pass (translation language)
    pub duplicates_removed_target: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Result of a validator pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Rows sent for checking
    pub checked: usize,
    /// Rows whose correction differed from the stored row
    pub changed: usize,
    /// Rows actually written (0 in dry-run mode)
    pub updated: usize,
    /// Batches whose generation call failed
    pub failed_batches: usize,
    pub dry_run: bool,
}

/// Lifecycle of a triggered job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Succeeded,
    Failed,
}

/// Most recent triggered job, as reported by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    /// Owner token of the lease the job runs under
    pub job_id: Uuid,
    pub state: JobState,
    pub options: GenerationJobOptions,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub report: Option<SeedReport>,
    pub error: Option<String>,
}

impl JobRecord {
    pub fn running(job_id: Uuid, options: GenerationJobOptions, started_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            state: JobState::Running,
            options,
            started_at,
            finished_at: None,
            report: None,
            error: None,
        }
    }

    pub fn succeed(&mut self, report: SeedReport) {
        self.state = JobState::Succeeded;
        self.finished_at = Some(report.finished_at);
        self.report = Some(report);
    }

    pub fn fail(&mut self, error: String, at: DateTime<Utc>) {
        self.state = JobState::Failed;
        self.finished_at = Some(at);
        self.error = Some(error);
    }
}
