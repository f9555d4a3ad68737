use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use domain::PrintError;

use crate::connection::ConnectionManager;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retries transient printer failures with exponential backoff.
///
/// The only retry point in the pipeline: the executor and the connection
/// manager fail fast and leave the decision here.
pub struct RetryPolicy {
    manager: Arc<ConnectionManager>,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(manager: Arc<ConnectionManager>, base_delay: Duration) -> Self {
        Self {
            manager,
            base_delay,
        }
    }

    /// Delay before retry number `retry` (1-based): base, 2x base, 4x base, ...
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    /// Run `operation` up to `max_retries + 1` times.
    ///
    /// Permanent errors propagate unchanged after the attempt that raised
    /// them. Exhausting the retries wraps the last cause in
    /// [`PrintError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(
        &self,
        max_retries: u32,
        label: &str,
        mut operation: F,
    ) -> Result<T, PrintError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PrintError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                info!(label, attempt, delay_ms = delay.as_millis() as u64, "Retrying after backoff");
                self.manager.reset().await;
                sleep(delay).await;
            }

            let last_error = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !last_error.is_transient() {
                warn!(label, attempt, error = %last_error, "Permanent failure, not retrying");
                return Err(last_error);
            }

            if attempt >= max_retries {
                warn!(label, retries = max_retries, error = %last_error, "Retries exhausted");
                return Err(PrintError::RetriesExhausted {
                    label: label.to_string(),
                    retries: max_retries,
                    source: Box::new(last_error),
                });
            }

            warn!(label, attempt, error = %last_error, "Transient failure");
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::printer::{DeviceCandidate, DeviceChannel, PrinterDriver};

    struct NoDriver;

    #[async_trait::async_trait]
    impl PrinterDriver for NoDriver {
        async fn discover(&self) -> Result<Vec<DeviceCandidate>, PrintError> {
            Ok(Vec::new())
        }

        async fn construct(
            &self,
            _candidate: &DeviceCandidate,
        ) -> Result<Box<dyn DeviceChannel>, PrintError> {
            Err(PrintError::NoDeviceFound)
        }

        fn kind(&self) -> &'static str {
            "none"
        }
    }

    fn policy(base: Duration) -> RetryPolicy {
        let manager = Arc::new(ConnectionManager::new(Arc::new(NoDriver), None));
        RetryPolicy::new(manager, base)
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = policy(Duration::from_millis(1000));
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff(3), Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_does_not_wait() {
        let policy = policy(DEFAULT_BASE_DELAY);
        let start = tokio::time::Instant::now();
        let value = policy.run(3, "x", || async { Ok::<_, PrintError>(7) }).await;
        assert_eq!(value, Ok(7));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_wraps_first_transient_error() {
        let policy = policy(DEFAULT_BASE_DELAY);
        let err = policy
            .run(0, "probe", || async {
                Err::<(), _>(PrintError::Timeout(Duration::from_secs(1)))
            })
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("probe failed after 0 retries"));
    }
}
