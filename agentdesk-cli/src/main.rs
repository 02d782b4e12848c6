//! Agentdesk CLI
//!
//! Command-line front end for the agent management console's logs.

mod commands;
mod config;
mod render;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "agentdesk")]
#[command(about = "Agent console log CLI", long_about = None)]
struct Cli {
    /// Console backend URL
    #[arg(long, env = "AGENTDESK_URL", default_value = "http://localhost:8080")]
    console_url: String,

    /// Bearer token issued by the console login
    #[arg(long, env = "AGENTDESK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Show client diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so they never interleave with log output
    let default_filter = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config {
        console_url: cli.console_url,
        token: cli.token,
    };

    handle_command(cli.command, &config).await
}
