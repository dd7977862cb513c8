use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::app::{Result, TrailbusterError};
use crate::browser::Page;

/// Bounded retry with exponential backoff (`base`, `2*base`, `4*base`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Run `op` until it succeeds or the attempt budget is spent.
///
/// The final attempt's error is returned unchanged.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        debug!("{} attempt {}/{}", label, attempt, max_attempts);
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                let wait = policy.delay_after(attempt);
                warn!("{} attempt {} failed: {}", label, attempt, e);
                debug!("Waiting {:?} before retry...", wait);
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Navigate `page` to `url`, retrying failures with backoff.
///
/// Returns the number of attempts used.
pub async fn navigate_with_retry(page: &dyn Page, url: &str, policy: &RetryPolicy) -> Result<u32> {
    let started = Instant::now();
    let mut used = 0;

    let result = retry_with_backoff(policy, "Navigation", |attempt| {
        used = attempt;
        page.goto(url)
    })
    .await;

    match result {
        Ok(()) => {
            info!(
                url,
                attempts = used,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Page navigation complete"
            );
            Ok(used)
        }
        Err(TrailbusterError::Navigation { message, .. }) => Err(TrailbusterError::Navigation {
            url: url.to_string(),
            attempts: used,
            message,
        }),
        Err(e) => Err(TrailbusterError::Navigation {
            url: url.to_string(),
            attempts: used,
            message: e.to_string(),
        }),
    }
}
