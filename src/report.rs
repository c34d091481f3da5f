//! Run accounting: counters, error breakdown, and the persisted failure list.
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::model::{DeliveryOutcome, FailedDelivery, Recipient};

/// Mutable aggregate for one run. Created at start, fed after every batch,
/// persisted once at the end.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub total_successful: usize,
    pub total_failed: usize,
    /// Failure counts keyed by the artifact error label.
    pub failures_by_kind: BTreeMap<String, usize>,
    /// Every non-success terminal outcome, in batch order.
    pub unresolved: Vec<FailedDelivery>,
    started_at: DateTime<Utc>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            total_successful: 0,
            total_failed: 0,
            failures_by_kind: BTreeMap::new(),
            unresolved: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Fold one settled batch into the totals. Returns the batch's
    /// (successful, failed) counts for progress logging.
    pub fn record_batch(&mut self, outcomes: &[DeliveryOutcome]) -> (usize, usize) {
        let mut ok = 0;
        let mut failed = 0;
        for outcome in outcomes {
            match outcome.status.error_label() {
                None => ok += 1,
                Some(label) => {
                    failed += 1;
                    *self.failures_by_kind.entry(label.clone()).or_insert(0) += 1;
                    self.unresolved.push(FailedDelivery {
                        fid: outcome.fid,
                        error: label,
                    });
                }
            }
        }
        self.total_successful += ok;
        self.total_failed += failed;
        (ok, failed)
    }

    /// Count a whole batch as failed under one label. Used when the batch
    /// never settled normally, so there are no per-recipient outcomes.
    pub fn record_batch_fault(&mut self, batch: &[Recipient], error: &str) {
        self.total_failed += batch.len();
        *self
            .failures_by_kind
            .entry(error.to_string())
            .or_insert(0) += batch.len();
        for recipient in batch {
            self.unresolved.push(FailedDelivery {
                fid: recipient.fid,
                error: error.to_string(),
            });
        }
    }

    pub fn total_settled(&self) -> usize {
        self.total_successful + self.total_failed
    }

    /// Percentage of settled deliveries that succeeded; `None` before
    /// anything settled.
    pub fn success_rate(&self) -> Option<f64> {
        let settled = self.total_settled();
        if settled == 0 {
            return None;
        }
        Some(self.total_successful as f64 / settled as f64 * 100.0)
    }

    /// Write the unresolved failures as pretty JSON. Nothing is written (and
    /// any previous artifact is left alone) when the run had no failures.
    /// Returns whether a file was written.
    pub fn persist_failures(&self, path: &Path) -> Result<bool> {
        if self.unresolved.is_empty() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create output directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(&self.unresolved)
            .context("failed to encode failure list")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write failure list: {}", path.display()))?;
        Ok(true)
    }

    /// Final human-readable summary: totals, rate, per-kind breakdown.
    pub fn log_summary(&self) {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        info!(
            successful = self.total_successful,
            failed = self.total_failed,
            elapsed_secs = elapsed.num_seconds(),
            "run complete"
        );
        if let Some(rate) = self.success_rate() {
            info!("success rate: {:.1}%", rate);
        }
        for (kind, count) in &self.failures_by_kind {
            warn!(count, "failure kind: {}", kind);
        }
    }
}
