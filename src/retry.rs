use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use crate::farcaster::FarcasterService;
use crate::model::{DeliveryOutcome, DeliveryStatus, Recipient};

/// Retry budget for one recipient.
///
/// `max_retries` counts retries after the initial attempt: a budget of 1
/// allows at most two requests in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Wait before retry `n` (0-indexed). A 429 escalates exponentially,
    /// `base * 2^n`; every other retryable cause backs off linearly,
    /// `base * (n + 1)`.
    pub fn delay_for(&self, retry: u32, status: &DeliveryStatus) -> Duration {
        match status {
            DeliveryStatus::HttpError { status: 429 } => {
                self.base_delay * 2u32.saturating_pow(retry)
            }
            _ => self.base_delay * (retry + 1),
        }
    }
}

/// Drive one recipient's delivery to a terminal outcome: send, classify,
/// wait, retry, until success or the budget runs out. Every attempt gets a
/// fresh notification id, so the endpoint sees each retry as a distinct
/// submission.
pub async fn deliver_with_retry(
    svc: &dyn FarcasterService,
    recipient: &Recipient,
    policy: RetryPolicy,
) -> DeliveryOutcome {
    let mut retry = 0u32;
    loop {
        let outcome = svc.send_notification(recipient, Uuid::new_v4()).await;
        if !outcome.status.is_retryable() || retry >= policy.max_retries {
            return outcome;
        }
        let delay = policy.delay_for(retry, &outcome.status);
        retry += 1;
        info!(
            fid = recipient.fid,
            retry,
            max = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            "delivery failed; retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
