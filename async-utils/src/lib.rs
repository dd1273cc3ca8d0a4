//! Async utilities for deadline-bounded futures.
//!
//! Provides the `WithDeadlineExt` trait for racing a future against a
//! fixed timeout. Losing the race drops the inner future, so any request
//! it had in flight is abandoned rather than left running.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Error returned when a future does not complete before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {timeout:?} elapsed")]
pub struct DeadlineElapsed {
    pub timeout: Duration,
}

/// Extension trait for bounding futures by a deadline.
#[async_trait]
pub trait WithDeadlineExt: Sized {
    type Output;

    /// Race this future against `timeout`.
    ///
    /// Returns `Ok(output)` if the future completes first, or
    /// `Err(DeadlineElapsed)` once the timeout passes.
    async fn with_deadline(self, timeout: Duration) -> Result<Self::Output, DeadlineElapsed>;
}

#[async_trait]
impl<F> WithDeadlineExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn with_deadline(self, timeout: Duration) -> Result<Self::Output, DeadlineElapsed> {
        tokio::time::timeout(timeout, self)
            .await
            .map_err(|_| DeadlineElapsed { timeout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::time::sleep;

    #[tokio::test]
    async fn returns_ok_when_future_completes_first() {
        let value = async { 42 };

        let result = value.with_deadline(Duration::from_secs(1)).await;

        assert_eq!(Ok(42), result);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_err_when_deadline_passes_first() {
        let result = async {
            sleep(Duration::from_secs(30)).await;
            7
        }
        .with_deadline(Duration::from_secs(10))
        .await;

        assert_eq!(
            Err(DeadlineElapsed {
                timeout: Duration::from_secs(10)
            }),
            result
        );
    }

    #[tokio::test(start_paused = true)]
    async fn inner_future_is_dropped_on_timeout() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let result = async move {
            sleep(Duration::from_secs(5)).await;
            flag.store(true, Ordering::SeqCst);
        }
        .with_deadline(Duration::from_secs(1))
        .await;

        sleep(Duration::from_secs(10)).await;
        assert!(result.is_err());
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[test]
    fn display_names_the_timeout() {
        let err = DeadlineElapsed {
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "deadline of 1.5s elapsed");
    }
}
