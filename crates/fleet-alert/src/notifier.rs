use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::recipient::ContactMethod;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn method(&self) -> ContactMethod;
    async fn send(&self, address: &str, body: &str) -> Result<(), NotifyError>;
}

/// Drives one notifier with the recipient's retry policy (spec §4.6:
/// "delivery attempt that returns failure is retried, up to
/// `retry_attempts` spaced by `retry_interval`"). A template-render error
/// never reaches here; it is fatal for the attempt before a notifier is
/// even invoked.
pub async fn send_with_retry(
    notifier: &dyn Notifier,
    address: &str,
    body: &str,
    retry_attempts: u32,
    retry_interval: Duration,
) -> Result<(), NotifyError> {
    let mut last_err = None;
    for attempt in 0..=retry_attempts {
        match notifier.send(address, body).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                warn!(attempt, method = ?notifier.method(), "notification delivery failed");
                last_err = Some(err);
                if attempt < retry_attempts {
                    tokio::time::sleep(retry_interval).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| NotifyError::DeliveryFailed("no attempts made".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyNotifier {
        succeed_after: u32,
        attempts: AtomicU32,
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        fn method(&self) -> ContactMethod {
            ContactMethod::Sms
        }

        async fn send(&self, _address: &str, _body: &str) -> Result<(), NotifyError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.succeed_after {
                Err(NotifyError::DeliveryFailed("transient".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success_within_budget() {
        let notifier = FlakyNotifier { succeed_after: 2, attempts: AtomicU32::new(0) };
        let result = send_with_retry(&notifier, "+1555", "body", 3, Duration::from_millis(1)).await;
        assert!(result.is_ok());
        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_retry_budget_exhausted() {
        let notifier = FlakyNotifier { succeed_after: 100, attempts: AtomicU32::new(0) };
        let result = send_with_retry(&notifier, "+1555", "body", 2, Duration::from_millis(1)).await;
        assert!(result.is_err());
        assert_eq!(notifier.attempts.load(Ordering::SeqCst), 3);
    }
}
