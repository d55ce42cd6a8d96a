//! # Conflict Retry
//!
//! Runs a read-then-commit unit again when its commit loses an optimistic
//! concurrency race. Each attempt must build a fresh transaction so the
//! pre-state is re-read.
//!
//! ```text
//!   attempt 1 ── Conflict ──► sleep ~initial_backoff ──► attempt 2 ── ...
//!   attempt N ── Conflict ──► EngineError::Conflict to the caller
//!   any attempt ── other error ──► returned immediately
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};

use backoff::future::retry;
use backoff::ExponentialBackoff;
use mercado_sync::EngineSettings;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

fn backoff_policy(settings: &EngineSettings) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: settings.initial_backoff(),
        max_interval: settings.max_backoff(),
        multiplier: 2.0,
        max_elapsed_time: None, // bounded by attempt count instead
        ..Default::default()
    }
}

/// Calls `op` until it succeeds, fails with something other than a
/// conflict, or `max_commit_attempts` is reached.
pub async fn with_conflict_retry<T, F, Fut>(
    settings: &EngineSettings,
    operation: &str,
    mut op: F,
) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let max_attempts = settings.max_commit_attempts.max(1);
    let attempts = AtomicU32::new(0);

    retry(backoff_policy(settings), || {
        let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let fut = op();
        async move {
            match fut.await {
                Ok(value) => Ok(value),
                Err(e @ EngineError::Conflict(_)) if attempt < max_attempts => {
                    debug!(operation, attempt, max_attempts, error = %e, "Commit conflict, retrying");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        }
    })
    .await
}
