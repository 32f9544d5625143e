use anyhow::Result;
use tokio::time::{sleep, Duration};
use tracing::{error, warn};

/// Fixed-delay bounded retry for transport calls.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetrySettings {
    /// Run `operation` up to `attempts` times, sleeping `delay` between
    /// failed attempts. Returns the last error once attempts are exhausted.
    pub async fn run_with_retry<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        for attempt in 1..=self.attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.attempts => {
                    warn!(
                        "attempt {attempt}/{} failed: {e}, retrying in {:?}",
                        self.attempts, self.delay
                    );
                    sleep(self.delay).await;
                }
                Err(e) => {
                    error!("all {attempt} attempts failed: {e}");
                    return Err(e);
                }
            }
        }
        unreachable!("retry loop exhausted unexpectedly")
    }
}
