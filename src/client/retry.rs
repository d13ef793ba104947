use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry-until-success with a fixed wait between attempts.
///
/// There is no attempt cap: a window whose requests never succeed keeps
/// retrying and is never dropped.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    interval: Duration,
}

impl RetryPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn run<F, Fut, T, E>(&self, operation: &str, mut attempt_fn: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            match attempt_fn().await {
                Ok(result) => {
                    if attempts > 1 {
                        debug!(operation, attempts, "Request succeeded after retries");
                    }
                    return result;
                }
                Err(e) => {
                    warn!(
                        operation,
                        attempt = attempts,
                        retry_in_ms = self.interval.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = &AtomicUsize::new(0);
        let policy = RetryPolicy::fixed(Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        let value = policy
            .run("flaky", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 3 {
                    Err(format!("failure {}", n))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // Three failures, each followed by exactly one fixed wait
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_gives_up() {
        let calls = &AtomicUsize::new(0);
        let policy = RetryPolicy::fixed(Duration::from_secs(1));

        let outcome = tokio::time::timeout(
            Duration::from_secs(60),
            policy.run("always failing", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("nope")
            }),
        )
        .await;

        assert!(outcome.is_err());
        assert!(calls.load(Ordering::SeqCst) >= 60);
    }
}
