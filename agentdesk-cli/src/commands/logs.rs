//! Log command handlers
//!
//! Lists sources, pages through history, downloads log files and tails the
//! live log stream.

use std::path::PathBuf;
use std::sync::Arc;

use agentdesk_client::ConsoleClient;
use agentdesk_core::domain::connection::ConnectionState;
use agentdesk_core::domain::log::{LogEntry, LogLevel};
use agentdesk_core::dto::log::{DEFAULT_PAGE_SIZE, DownloadQuery, LogQuery};
use agentdesk_viewer::{HttpLogRepository, LogViewer, ViewerEvent};
use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast::error::RecvError;

use super::shutdown_signal;
use crate::config::Config;
use crate::render::{connection_banner, passes, print_log_entry, unseen_tail};

/// Log subcommands
#[derive(Subcommand)]
pub enum LogsCommands {
    /// List known log sources
    Sources,
    /// Show one page of log history
    List {
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Entries per page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,

        /// Only entries from this source
        #[arg(long)]
        source: Option<String>,

        /// Hide entries below this level
        #[arg(long)]
        level: Option<LogLevel>,

        /// Print raw JSON, one entry per line
        #[arg(long)]
        json: bool,
    },
    /// Follow the live log stream
    Tail {
        /// Only entries from this source
        #[arg(long)]
        source: Option<String>,

        /// Hide entries below this level
        #[arg(long)]
        level: Option<LogLevel>,

        /// Server-side batching window in seconds
        #[arg(long)]
        granularity: Option<u64>,
    },
    /// Download the most recent lines as a file
    Download {
        /// Number of lines
        #[arg(long, default_value_t = 1000)]
        lines: usize,

        /// Only lines from this source
        #[arg(long)]
        source: Option<String>,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Handle log commands
pub async fn handle_logs_command(command: LogsCommands, config: &Config) -> Result<()> {
    match command {
        LogsCommands::Sources => list_sources(&config.client()).await,
        LogsCommands::List {
            page,
            page_size,
            source,
            level,
            json,
        } => {
            let query = LogQuery {
                page,
                page_size,
                source,
            };
            list_logs(&config.client(), &query, level, json).await
        }
        LogsCommands::Tail {
            source,
            level,
            granularity,
        } => tail_logs(config, source, level, granularity).await,
        LogsCommands::Download {
            lines,
            source,
            output,
        } => download_logs(&config.client(), DownloadQuery { lines, source }, output).await,
    }
}

/// List all log sources
async fn list_sources(client: &ConsoleClient) -> Result<()> {
    let sources = client.list_log_sources().await?;

    if sources.is_empty() {
        println!("{}", "No log sources found.".yellow());
    } else {
        println!("{}", format!("Found {} source(s):", sources.len()).bold());
        for source in sources {
            println!("  {} {}", "▸".cyan(), source);
        }
    }

    Ok(())
}

/// Show one page of history
async fn list_logs(
    client: &ConsoleClient,
    query: &LogQuery,
    level: Option<LogLevel>,
    json: bool,
) -> Result<()> {
    let page = client.get_logs(query).await?;
    let entries: Vec<&LogEntry> = page.logs.iter().filter(|e| passes(e, level)).collect();

    if json {
        for entry in entries {
            println!("{}", serde_json::to_string(entry)?);
        }
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No logs found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Logs (page {}):", query.page).bold());
    println!("{}", "─".repeat(80).dimmed());
    for entry in entries {
        print_log_entry(entry);
    }
    println!("{}", "─".repeat(80).dimmed());

    Ok(())
}

/// Follow the live stream until Ctrl-C
async fn tail_logs(
    config: &Config,
    source: Option<String>,
    level: Option<LogLevel>,
    granularity: Option<u64>,
) -> Result<()> {
    let mut repository = HttpLogRepository::new(config.client());
    if let Some(seconds) = granularity {
        repository = repository.with_granularity(seconds);
    }

    let mut viewer = LogViewer::new(Arc::new(repository), config.viewer_config()?);
    let mut events = viewer.subscribe();
    viewer.start(source.clone());

    eprintln!(
        "{}",
        format!(
            "Tailing {} (Ctrl-C to stop)",
            source.as_deref().unwrap_or("all sources")
        )
        .dimmed()
    );

    let mut last_printed: Option<LogEntry> = None;
    let mut shown_state: Option<ConnectionState> = None;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Ok(ViewerEvent::Appended(batch)) => {
                    print_entries(&batch, level, &mut last_printed);
                }
                Ok(ViewerEvent::Replaced(page)) => {
                    let fresh = unseen_tail(&page, last_printed.as_ref());
                    print_entries(fresh, level, &mut last_printed);
                }
                Ok(ViewerEvent::Phase(phase)) => {
                    let state = phase.connection_state();
                    if shown_state != Some(state) {
                        eprintln!("{}", connection_banner(state));
                        shown_state = Some(state);
                    }
                }
                Ok(ViewerEvent::Notice(message)) => {
                    eprintln!("{} {}", "⚠".yellow(), message.yellow());
                }
                Ok(ViewerEvent::Cleared) => {}
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("{}", format!("… {} updates skipped", skipped).dimmed());
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    viewer.stop();
    Ok(())
}

fn print_entries(entries: &[LogEntry], level: Option<LogLevel>, last_printed: &mut Option<LogEntry>) {
    for entry in entries.iter().filter(|e| passes(e, level)) {
        print_log_entry(entry);
    }
    if let Some(last) = entries.last() {
        *last_printed = Some(last.clone());
    }
}

/// Save or print a log download
async fn download_logs(
    client: &ConsoleClient,
    query: DownloadQuery,
    output: Option<PathBuf>,
) -> Result<()> {
    let body = client.download_logs(&query).await?;

    match output {
        Some(path) => {
            tokio::fs::write(&path, &body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} Saved {} bytes to {}",
                "✓".green(),
                body.len(),
                path.display()
            );
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&body).await.context("Failed to write to stdout")?;
            stdout.flush().await?;
        }
    }

    Ok(())
}
