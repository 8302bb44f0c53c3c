//! Opening the database session, with bounded retries.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::store::{self, Store};

/// How many times to try connecting, and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(30),
        }
    }
}

/// Runs `op` until it succeeds or `policy.attempts` tries have failed.
///
/// Each failure but the last is logged as a warning and followed by a fixed
/// `policy.delay` pause. The last error is returned with the attempt count attached.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(
                    attempt,
                    attempts,
                    delay_secs = policy.delay.as_secs(),
                    error = %e,
                    "Connection to DB failed, will retry"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                error!(attempts, error = %e, "Connection to DB failed, giving up");
                return Err(e.context(format!("giving up after {attempts} connection attempts")));
            }
        }
    }
}

/// Opens the store at `url`, retrying per `policy`.
///
/// The returned session is meant to be held for the life of the process.
#[tracing::instrument(skip(url), fields(attempts = policy.attempts))]
pub async fn connect(url: &str, policy: RetryPolicy) -> Result<Box<dyn Store>> {
    let store = retry(policy, || store::open(url)).await?;
    info!("Connection to DB established");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_default_policy() {
        let p = RetryPolicy::default();
        assert_eq!(p.attempts, 10);
        assert_eq!(p.delay, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_failures() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let value = retry(policy(10), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(anyhow!("connection refused"))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<()> = retry(policy(4), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow!("connection refused")) }
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(err.to_string().contains("giving up after 4"));
        // no pause after the final failure
        assert_eq!(start.elapsed(), Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_logs_final_failure_as_error() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let _ = retry(policy(2), || async { Err::<(), _>(anyhow!("connection refused")) }).await;

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let last = logs.lines().last().unwrap();
        assert!(last.contains("ERROR"));
        assert!(last.contains("giving up"));
        assert!(last.contains("connection refused"));
        assert_eq!(logs.matches("will retry").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let _ = retry(policy(0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(anyhow!("down")) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_sqlite_memory() {
        let store = connect("sqlite::memory:", policy(1)).await.unwrap();
        store.ensure_schema().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_unsupported_url_is_fatal() {
        let result = connect("mysql://localhost/velib", policy(2)).await;
        assert!(result.is_err());
    }
}
