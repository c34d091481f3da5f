use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::farcaster::FarcasterService;
use crate::model::{DeliveryOutcome, DeliveryStatus, Recipient};
use crate::report::RunReport;
use crate::retry::{deliver_with_retry, RetryPolicy};

/// Scheduler knobs, one per configuration field.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Recipients per batch. Zero is treated as one.
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub retry: RetryPolicy,
}

/// Run the whole campaign: partition `recipients` into contiguous batches,
/// deliver each batch concurrently, and fold every settled outcome into the
/// returned report. Batches run strictly one after another, `batch_delay`
/// apart; the delay is skipped after the final batch.
pub async fn run(
    svc: Arc<dyn FarcasterService>,
    recipients: Vec<Recipient>,
    opts: DispatchOptions,
) -> RunReport {
    let mut report = RunReport::new();
    if recipients.is_empty() {
        return report;
    }

    let batch_size = opts.batch_size.max(1);
    let total_batches = recipients.len().div_ceil(batch_size);
    info!(
        recipients = recipients.len(),
        batches = total_batches,
        batch_size,
        "dispatching"
    );

    for (index, batch) in recipients.chunks(batch_size).enumerate() {
        let number = index + 1;
        info!(
            batch = number,
            total = total_batches,
            size = batch.len(),
            "processing batch"
        );

        // The batch runs as its own task so a fault in the dispatch path
        // marks this batch failed instead of killing the run.
        let handle = tokio::spawn(process_batch(svc.clone(), batch.to_vec(), opts.retry));
        match handle.await {
            Ok(outcomes) => {
                let (ok, failed) = report.record_batch(&outcomes);
                info!(
                    batch = number,
                    total = total_batches,
                    ok,
                    failed,
                    "batch settled"
                );
                log_batch_failures(&outcomes);
            }
            Err(err) => {
                warn!(?err, batch = number, "batch dispatch fault; marking whole batch failed");
                report.record_batch_fault(batch, &format!("batch dispatch fault: {}", err));
            }
        }

        if number < total_batches {
            info!(
                delay_ms = opts.batch_delay.as_millis() as u64,
                "waiting before next batch"
            );
            tokio::time::sleep(opts.batch_delay).await;
        }
    }

    report
}

/// Deliver one batch. Every recipient's retry loop runs as its own task and
/// the batch completes only when all of them have settled, successes and
/// failures alike. A task that dies is converted into a network-kind failure
/// for its recipient; siblings are unaffected. Outcomes come back in batch
/// order.
async fn process_batch(
    svc: Arc<dyn FarcasterService>,
    batch: Vec<Recipient>,
    policy: RetryPolicy,
) -> Vec<DeliveryOutcome> {
    let handles: Vec<_> = batch
        .iter()
        .cloned()
        .map(|recipient| {
            let svc = svc.clone();
            tokio::spawn(async move { deliver_with_retry(svc.as_ref(), &recipient, policy).await })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .zip(batch)
        .map(|(settled, recipient)| match settled {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(?err, fid = recipient.fid, "delivery task fault");
                DeliveryOutcome {
                    fid: recipient.fid,
                    status: DeliveryStatus::NetworkError {
                        message: format!("delivery task failed: {}", err),
                    },
                }
            }
        })
        .collect()
}

fn log_batch_failures(outcomes: &[DeliveryOutcome]) {
    let failed: Vec<String> = outcomes
        .iter()
        .filter_map(|o| {
            o.status
                .error_label()
                .map(|label| format!("{} ({})", o.fid, label))
        })
        .collect();
    if !failed.is_empty() {
        warn!(failed = %failed.join(", "), "failed in this batch");
    }
}
