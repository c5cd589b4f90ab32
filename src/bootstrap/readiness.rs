use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::daemon::ModelControl;
use crate::error::{BootstrapError, Result};

/// Fixed-interval readiness check with an overall deadline.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPoller {
    pub interval: Duration,
    pub timeout: Duration,
}

impl ReadinessPoller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Returns the number of `list_models` calls it took, the last one being the
    /// first listing that carried the readiness token.
    pub async fn wait_ready<C>(&self, control: &C, cancel: &CancellationToken) -> Result<u32>
    where
        C: ModelControl + ?Sized,
    {
        let token = control.readiness_token();
        let start = Instant::now();
        // None when the timeout is too large to represent: poll without a deadline.
        let deadline = start.checked_add(self.timeout);
        let mut attempts = 0u32;
        let mut last_notice = start;

        loop {
            attempts += 1;
            let attempt = tokio::select! {
                result = before(deadline, control.list_models()) => match result {
                    Some(result) => result,
                    None => {
                        tracing::debug!(attempts, "Daemon listing still pending at deadline");
                        return Err(self.not_ready(attempts));
                    }
                },
                _ = cancel.cancelled() => {
                    return Err(BootstrapError::SupervisorInterrupted { signal: None });
                }
            };

            match attempt {
                Ok(listing) if listing.contains(token) => {
                    tracing::info!(attempts, elapsed = ?start.elapsed(), "Daemon ready");
                    return Ok(attempts);
                }
                Ok(_) => tracing::debug!(attempts, "Daemon listing not ready yet"),
                Err(err) => tracing::debug!(attempts, error = %err, "Daemon not answering yet"),
            }

            let now = Instant::now();
            if let Some(deadline) = deadline {
                let next_attempt = now.checked_add(self.interval);
                if next_attempt.map_or(true, |next| next > deadline) {
                    return Err(self.not_ready(attempts));
                }
            }
            if now.duration_since(last_notice) >= Duration::from_secs(10) {
                tracing::info!(attempts, "Waiting for daemon to be ready...");
                last_notice = now;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = cancel.cancelled() => {
                    return Err(BootstrapError::SupervisorInterrupted { signal: None });
                }
            }
        }
    }

    fn not_ready(&self, attempts: u32) -> BootstrapError {
        BootstrapError::DaemonNotReady {
            timeout: self.timeout,
            attempts,
        }
    }
}

/// `None` if `deadline` passes before `fut` resolves.
async fn before<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}
