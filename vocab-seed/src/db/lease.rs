//! Seed lease persisted in `server_state`
//!
//! A named row acts as a cross-process mutual-exclusion flag. Holding the
//! lease is proven by the owner token written at acquisition; release only
//! clears the row when the token still matches, so a job can never release
//! a lease somebody else reclaimed.
//!
//! Leases have no expiry unless a TTL is configured. A job that crashes
//! while holding a TTL-less lease leaves it held; [`SeedLock::status`]
//! shows the holder and [`SeedLock::force_release`] clears it.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;
use vocab_common::{time, Error, Result};

/// Lock row guarding vocabulary generation
pub const SEED_LOCK_NAME: &str = "vocabGeneration";

/// Proof of holding a lease
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lease {
    pub name: String,
    pub owner: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Snapshot of a lease row
#[derive(Debug, Clone, Serialize)]
pub struct LeaseStatus {
    pub name: String,
    pub locked: bool,
    pub owner: Option<String>,
    pub acquired_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Held, but past its expiry; the next acquire reclaims it
    pub expired: bool,
}

impl LeaseStatus {
    /// Held and not expired
    pub fn is_held(&self) -> bool {
        self.locked && !self.expired
    }
}

/// Handle to one named lease
#[derive(Debug, Clone)]
pub struct SeedLock {
    pool: SqlitePool,
    name: String,
    ttl: Option<Duration>,
}

impl SeedLock {
    /// The `vocabGeneration` lease, without expiry
    pub fn new(pool: SqlitePool) -> Self {
        Self::named(pool, SEED_LOCK_NAME)
    }

    pub fn named(pool: SqlitePool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
            ttl: None,
        }
    }

    /// Let acquired leases expire after `ttl`
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn ensure_row(&self) -> Result<()> {
        sqlx::query(
            "INSERT INTO server_state (name, locked, updated_at) VALUES (?, 0, ?)
             ON CONFLICT(name) DO NOTHING",
        )
        .bind(&self.name)
        .bind(time::now_db())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Take the lease, or fail with [`Error::Locked`] if someone holds it
    ///
    /// The check and the write are one conditional `UPDATE`, so two callers
    /// racing for a free lease cannot both win.
    pub async fn acquire(&self) -> Result<Lease> {
        self.ensure_row().await?;

        let previous = self.status().await?;

        let now = time::now();
        let owner = Uuid::new_v4();
        let expires_at = match self.ttl {
            Some(ttl) => Some(
                now + chrono::Duration::from_std(ttl)
                    .map_err(|e| Error::Config(format!("Lease TTL out of range: {}", e)))?,
            ),
            None => None,
        };

        let result = sqlx::query(
            r#"
            UPDATE server_state
               SET locked = 1,
                   owner = ?,
                   acquired_at = ?,
                   expires_at = ?,
                   updated_at = ?
             WHERE name = ?
               AND (locked = 0 OR (expires_at IS NOT NULL AND expires_at <= ?))
            "#,
        )
        .bind(owner.to_string())
        .bind(time::to_db(now))
        .bind(expires_at.map(time::to_db))
        .bind(time::to_db(now))
        .bind(&self.name)
        .bind(time::to_db(now))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() != 1 {
            let current = self.status().await?;
            return Err(Error::Locked {
                name: self.name.clone(),
                owner: current.owner.unwrap_or_else(|| "unknown".to_string()),
            });
        }

        if previous.locked && previous.expired {
            warn!(
                lock = %self.name,
                previous_owner = previous.owner.as_deref().unwrap_or("unknown"),
                "Reclaimed expired lease"
            );
        }

        info!(lock = %self.name, owner = %owner, "Lease acquired");

        Ok(Lease {
            name: self.name.clone(),
            owner,
            acquired_at: now,
            expires_at,
        })
    }

    /// Give the lease back
    ///
    /// Returns false when the row no longer carries this lease's owner token
    /// (it expired and was reclaimed, or was force-released).
    pub async fn release(&self, lease: &Lease) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE server_state
               SET locked = 0,
                   owner = NULL,
                   acquired_at = NULL,
                   expires_at = NULL,
                   updated_at = ?
             WHERE name = ? AND owner = ?
            "#,
        )
        .bind(time::now_db())
        .bind(&lease.name)
        .bind(lease.owner.to_string())
        .execute(&self.pool)
        .await?;

        let released = result.rows_affected() == 1;
        if released {
            info!(lock = %lease.name, owner = %lease.owner, "Lease released");
        } else {
            warn!(
                lock = %lease.name,
                owner = %lease.owner,
                "Lease was no longer held by this owner"
            );
        }
        Ok(released)
    }

    /// Whether the lease is currently held (expired leases count as free)
    pub async fn is_locked(&self) -> Result<bool> {
        Ok(self.status().await?.is_held())
    }

    pub async fn status(&self) -> Result<LeaseStatus> {
        let row = sqlx::query(
            "SELECT locked, owner, acquired_at, expires_at, updated_at FROM server_state WHERE name = ?",
        )
        .bind(&self.name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(LeaseStatus {
                name: self.name.clone(),
                locked: false,
                owner: None,
                acquired_at: None,
                expires_at: None,
                updated_at: None,
                expired: false,
            });
        };

        let parse = |value: Option<String>| value.as_deref().map(time::from_db).transpose();

        let locked: i64 = row.get("locked");
        let expires_at = parse(row.get("expires_at"))?;
        let expired = locked != 0 && expires_at.map(|at| at <= time::now()).unwrap_or(false);

        Ok(LeaseStatus {
            name: self.name.clone(),
            locked: locked != 0,
            owner: row.get("owner"),
            acquired_at: parse(row.get("acquired_at"))?,
            expires_at,
            updated_at: parse(row.get("updated_at"))?,
            expired,
        })
    }

    /// Clear the lease regardless of owner
    ///
    /// Operator tool for leases stuck behind a crashed job.
    pub async fn force_release(&self) -> Result<bool> {
        let status = self.status().await?;
        if !status.locked {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE server_state
               SET locked = 0, owner = NULL, acquired_at = NULL, expires_at = NULL, updated_at = ?
             WHERE name = ?
            "#,
        )
        .bind(time::now_db())
        .bind(&self.name)
        .execute(&self.pool)
        .await?;

        warn!(
            lock = %self.name,
            previous_owner = status.owner.as_deref().unwrap_or("unknown"),
            "Lease force-released"
        );
        Ok(true)
    }

    /// Run `work` with an already-acquired lease, then release it
    ///
    /// The lease is released on every exit path: normal completion, an
    /// `Err` returned by `work`, or a panic (which is resumed afterwards).
    pub async fn scoped<Fut, T>(&self, lease: Lease, work: Fut) -> T
    where
        Fut: Future<Output = T>,
    {
        let outcome = AssertUnwindSafe(work).catch_unwind().await;

        if let Err(e) = self.release(&lease).await {
            error!(
                lock = %lease.name,
                owner = %lease.owner,
                error = %e,
                "Failed to release lease"
            );
        }

        match outcome {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Acquire, run `work`, release
    pub async fn run_exclusive<F, Fut, T>(&self, work: F) -> Result<T>
    where
        F: FnOnce(Lease) -> Fut,
        Fut: Future<Output = T>,
    {
        let lease = self.acquire().await?;
        let fut = work(lease.clone());
        Ok(self.scoped(lease, fut).await)
    }
}
