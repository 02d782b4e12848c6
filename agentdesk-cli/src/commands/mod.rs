//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod container;
mod logs;

pub use container::ContainerCommands;
pub use logs::LogsCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Structured console logs
    Logs {
        #[command(subcommand)]
        command: LogsCommands,
    },
    /// Sandbox container output
    Container {
        #[command(subcommand)]
        command: ContainerCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Logs { command } => logs::handle_logs_command(command, config).await,
        Commands::Container { command } => {
            container::handle_container_command(command, config).await
        }
    }
}

/// Resolves once Ctrl-C is pressed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
