//! `roster` — terminal client for a user roster service.
//!
//! Search-as-you-type over the user listing (debounced behind a quiescence
//! window), plus create and upsert forms with duplicate-submission
//! protection. Listing refreshes automatically after every successful
//! mutation.
//!
//! Logs are written to a file (default `/tmp/roster.log`) to avoid
//! corrupting the terminal UI.
//!
//! Entry point: CLI argument parsing, tracing setup, panic hooks, and app
//! launch.

mod action;
mod app;
mod event;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::Result;
use roster_api::{TransportConfig, UsersClient};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;

/// Terminal client for browsing and editing a user roster.
#[derive(Parser, Debug)]
#[command(name = "roster", version, about)]
struct Cli {
    /// Server base URL (e.g., http://localhost:3000)
    #[arg(short, long, env = "ROSTER_URL")]
    server: Option<String>,

    /// Per-request timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Search quiescence window in milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Log file path (defaults to /tmp/roster.log)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Set up file-based tracing. We MUST NOT log to stdout/stderr — that would
/// corrupt the TUI output. Returns a guard that must be held for the
/// lifetime of the application to ensure logs are flushed.
fn setup_tracing(log_file: &std::path::Path, verbose: u8) -> WorkerGuard {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "roster={log_level},roster_core={log_level},roster_api={log_level}"
        ))
    });

    let log_dir = log_file.parent().unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("roster.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Install panic/error hooks BEFORE entering the terminal
    tui::install_hooks()?;

    // Priority: CLI flags > config file (+ ROSTER_* env) > defaults
    let config = roster_config::load_config_or_default();

    let log_file = cli.log_file.unwrap_or_else(|| config.log_file.clone());
    let _log_guard = setup_tracing(&log_file, cli.verbose);

    let server = cli
        .server
        .or(config.server)
        .unwrap_or_else(|| "http://localhost:3000".to_owned());
    let transport = TransportConfig {
        timeout: Duration::from_secs(cli.timeout.unwrap_or(config.timeout)),
    };
    let debounce = Duration::from_millis(cli.debounce_ms.unwrap_or(config.debounce_ms));

    info!(server = %server, ?debounce, "starting roster");

    let client = UsersClient::new(&server, &transport)?;
    let mut app = App::new(client, debounce, server);
    app.run().await?;

    Ok(())
}
