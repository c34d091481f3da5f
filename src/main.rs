use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::Url;
use serde_json::to_string_pretty;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use fc_notify::config;
use fc_notify::dispatch::{self, DispatchOptions};
use fc_notify::farcaster::{build_payload, FarcasterClient, FarcasterService, NotificationContent};
use fc_notify::model::Recipient;
use fc_notify::recipients;
use fc_notify::retry::RetryPolicy;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Send a Farcaster frame notification to every qualified recipient in a CSV export"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Recipient CSV path; overrides `source.csv_path` from the config.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// When set, print notification payloads instead of sending them.
    #[arg(long)]
    dry_run: bool,

    /// Print an example config and exit.
    #[arg(long)]
    print_example_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if args.print_example_config {
        print!("{}", config::example());
        return Ok(());
    }

    let cfg = config::load(Some(&args.config))?;
    let csv_path = args
        .csv
        .unwrap_or_else(|| PathBuf::from(&cfg.source.csv_path));
    if !csv_path.exists() {
        bail!("recipient CSV not found: {}", csv_path.display());
    }

    info!(
        csv = %csv_path.display(),
        title = %cfg.notification.title,
        target_url = %cfg.notification.target_url,
        "starting notification run"
    );

    let source = recipients::load(&csv_path)?;
    info!(
        rows = source.total_rows,
        qualified = source.recipients.len(),
        skipped = source.skipped,
        "recipient source read"
    );

    if source.recipients.is_empty() {
        info!("no qualified recipients; nothing to send");
        return Ok(());
    }

    let content = NotificationContent {
        title: cfg.notification.title.clone(),
        body: cfg.notification.body.clone(),
        target_url: cfg.notification.target_url.clone(),
    };

    if args.dry_run {
        return print_payloads(&content, &source.recipients);
    }

    let endpoint = Url::parse(&cfg.delivery.endpoint).context("invalid delivery.endpoint URL")?;
    let client = FarcasterClient::new(
        endpoint,
        content,
        &cfg.delivery.user_agent,
        cfg.delivery.request_timeout(),
    );
    let svc: Arc<dyn FarcasterService> = Arc::new(client);

    let opts = DispatchOptions {
        batch_size: cfg.delivery.batch_size,
        batch_delay: cfg.delivery.batch_delay(),
        retry: RetryPolicy::new(cfg.delivery.max_retries, cfg.delivery.retry_delay()),
    };

    let report = tokio::select! {
        report = dispatch::run(svc, source.recipients, opts) => report,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupt received; stopping");
            return Ok(());
        }
    };

    report.log_summary();

    let failures_path = PathBuf::from(&cfg.output.failures_path);
    if report.persist_failures(&failures_path)? {
        info!(
            path = %failures_path.display(),
            failures = report.unresolved.len(),
            "wrote unresolved failures for replay"
        );
    }

    Ok(())
}

fn print_payloads(content: &NotificationContent, recipients: &[Recipient]) -> Result<()> {
    for recipient in recipients {
        let payload = build_payload(content, recipient, Uuid::new_v4());
        println!(
            "\n[fid {}] notification payload\n{}",
            recipient.fid,
            to_string_pretty(&payload)?
        );
    }
    Ok(())
}
