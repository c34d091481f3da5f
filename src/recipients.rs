//! Recipient source: reads the campaign CSV and yields qualified recipients.
//!
//! Rows with an unset opt-in flag, a missing or placeholder token, or an
//! unusable fid are skipped and counted. A structurally broken stream (bad
//! quoting, ragged rows, unreadable file) is an error instead, since the rest
//! of the file can no longer be trusted.
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::model::Recipient;

/// Raw CSV row. Column names match the export header; columns the export
/// carries beyond these are ignored.
#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    added: String,
    #[serde(default)]
    fid: String,
    #[serde(rename = "notificationToken", default)]
    notification_token: String,
}

impl Row {
    /// A row qualifies when the opt-in flag reads true and it carries a
    /// usable token and fid. Returns `None` for rows to skip.
    fn qualify(&self) -> Option<Recipient> {
        if !self.added.trim().eq_ignore_ascii_case("true") {
            return None;
        }
        let token = self.notification_token.trim();
        if token.is_empty() || token == "null" {
            return None;
        }
        let fid = self.fid.trim().parse::<u64>().ok().filter(|fid| *fid > 0)?;
        Some(Recipient {
            fid,
            token: token.to_string(),
        })
    }
}

/// Lazy pass over the source file. Reopen via [`open`] to restart.
pub struct RecipientIter {
    inner: csv::DeserializeRecordsIntoIter<File, Row>,
    rows: usize,
    skipped: usize,
}

impl RecipientIter {
    /// Data rows read so far, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Rows read so far that did not qualify.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for RecipientIter {
    type Item = Result<Recipient>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(row) => {
                    self.rows += 1;
                    match row.qualify() {
                        Some(recipient) => return Some(Ok(recipient)),
                        None => {
                            debug!(row = self.rows, "skipping unqualified row");
                            self.skipped += 1;
                        }
                    }
                }
                Err(err) => {
                    return Some(
                        Err(err).context("failed to read a row from the recipient CSV"),
                    )
                }
            }
        }
    }
}

/// Open a fresh pass over the recipient CSV at `path`.
pub fn open(path: &Path) -> Result<RecipientIter> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open recipient CSV: {}", path.display()))?;
    Ok(RecipientIter {
        inner: reader.into_deserialize(),
        rows: 0,
        skipped: 0,
    })
}

/// Collected result of one full pass over the source file.
#[derive(Debug)]
pub struct SourceSummary {
    pub recipients: Vec<Recipient>,
    pub total_rows: usize,
    pub skipped: usize,
}

/// Read the whole file and collect every qualified recipient, in file order.
pub fn load(path: &Path) -> Result<SourceSummary> {
    let mut iter = open(path)?;
    let mut recipients = Vec::new();
    for recipient in &mut iter {
        recipients.push(recipient?);
    }
    Ok(SourceSummary {
        recipients,
        total_rows: iter.rows(),
        skipped: iter.skipped(),
    })
}
