//! One-shot bulk sender for Farcaster frame notifications.
//!
//! Reads a recipient CSV export, sends the configured notification to every
//! qualified recipient in bounded concurrent batches, retries transient
//! failures, and leaves a JSON list of unresolved failures behind for replay.

pub mod config;
pub mod dispatch;
pub mod farcaster;
pub mod model;
pub mod recipients;
pub mod report;
pub mod retry;
