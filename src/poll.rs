//! # Waiting
//!
//! Two kinds of waits exist in the harness:
//!
//! - [`poll_until`]: an active, bounded poll. Used wherever remote state can
//!   be observed (version counts, rotated file content, cluster events).
//! - [`settle`]: a fixed, logged sleep. Used only where nothing observable
//!   signals completion (IAM propagation, object visibility before
//!   `kubectl wait`).

use crate::error::{HarnessError, Result};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Poll `check` every `interval` until it returns `true` or `timeout` elapses
///
/// An `Err` from `check` aborts the poll immediately. The check always runs
/// at least once, even with a zero timeout.
pub async fn poll_until<F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start_time = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if check().await? {
            debug!(
                "{} after {} attempt(s) in {:.1}s",
                what,
                attempts,
                start_time.elapsed().as_secs_f64()
            );
            return Ok(());
        }

        if start_time.elapsed() >= timeout {
            return Err(HarnessError::Timeout {
                what: what.to_string(),
                timeout,
            });
        }

        debug!("⏳ waiting for {} (attempt {})", what, attempts);
        tokio::time::sleep(interval).await;
    }
}

/// Sleep for a fixed duration, logging why
pub async fn settle(delay: Duration, reason: &str) {
    if delay.is_zero() {
        return;
    }
    info!("⏳ sleeping {}s: {}", delay.as_secs(), reason);
    tokio::time::sleep(delay).await;
}
