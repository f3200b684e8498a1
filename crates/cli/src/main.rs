//! Scanwatch CLI - scanwatch command

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use scanwatch_watcher::{FailurePolicy, Monitor, MonitorConfig, Subscription};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod print;

use print::EventPrinter;

/// Scanwatch - report file changes by polling a directory tree
#[derive(Parser)]
#[command(name = "scanwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to monitor
    #[arg(env = "SCANWATCH_DIR", default_value = ".")]
    directory: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Delay between passes in milliseconds (overrides the config file)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Event kinds to report: created, updated, deleted or all
    #[arg(short, long, value_delimiter = ',', default_value = "all")]
    event: Vec<String>,

    /// Stop at the first listener failure
    #[arg(long)]
    fail_fast: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only events
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    if let Some(ms) = cli.interval_ms {
        config = config.with_poll_interval(Duration::from_millis(ms));
    }
    if cli.fail_fast {
        config = config.with_failure_policy(FailurePolicy::Abort);
    }

    let mut monitor = Monitor::with_config(&cli.directory, config)?;
    let printer = Arc::new(EventPrinter::new(monitor.root(), cli.json));
    for subscription in subscriptions(&cli.event)? {
        let printer = Arc::clone(&printer);
        monitor.register(subscription, move |event| printer.print(event));
    }

    let stop = monitor.stop_signal();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, finishing current pass");
                stop.stop();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    tokio::task::spawn_blocking(move || monitor.start())
        .await
        .context("Monitor thread panicked")??;

    Ok(())
}

/// Parse `--event` values into distinct subscriptions
///
/// `all` absorbs every other value and repeats are dropped, so each event
/// is printed once.
fn subscriptions(kinds: &[String]) -> Result<Vec<Subscription>> {
    let mut parsed: Vec<Subscription> = Vec::new();
    for kind in kinds {
        let subscription: Subscription = kind
            .parse()
            .with_context(|| format!("Invalid --event value '{}'", kind))?;
        if !parsed.contains(&subscription) {
            parsed.push(subscription);
        }
    }
    if parsed.contains(&Subscription::All) {
        parsed = vec![Subscription::All];
    }
    Ok(parsed)
}
