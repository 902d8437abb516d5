//! Database retry logic
//!
//! SQLite reports `SQLITE_BUSY` ("database is locked") when another
//! connection holds the write lock longer than the busy timeout. Writes in
//! the pipeline go through [`retry_on_busy`] so a short burst of contention
//! does not cost a whole unit of work.

use std::time::{Duration, Instant};
use vocab_common::{Error, Result};

/// Default ceiling on total retry time
pub const DEFAULT_MAX_WAIT_MS: u64 = 5000;

/// Retry a database operation with exponential backoff until `max_wait_ms` elapses.
///
/// Backoff starts at 10ms and doubles up to 1000ms. Errors other than
/// "database is locked" are returned immediately.
pub async fn retry_on_busy<F, Fut, T>(operation_name: &str, max_wait_ms: u64, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt = 0u32;
    let mut backoff_ms = 10u64;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if is_busy(&err) => {
                let elapsed = start_time.elapsed();
                if elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        max_wait_ms,
                        "Database still locked, giving up"
                    );
                    return Err(Error::Internal(format!(
                        "{}: database locked after {} attempts ({} ms)",
                        operation_name,
                        attempt,
                        elapsed.as_millis()
                    )));
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms,
                    "Database locked, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(1000);
            }
            Err(err) => return Err(err),
        }
    }
}

/// True for SQLite lock contention errors
pub fn is_busy(err: &Error) -> bool {
    match err {
        Error::Database(sqlx::Error::Database(db_err)) => {
            matches!(db_err.code().as_deref(), Some("5") | Some("6"))
                || is_busy_message(db_err.message())
        }
        _ => false,
    }
}

fn is_busy_message(message: &str) -> bool {
    message.contains("database is locked") || message.contains("database table is locked")
}
