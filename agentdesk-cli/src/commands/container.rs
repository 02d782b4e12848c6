//! Container command handlers

use std::sync::Arc;

use agentdesk_core::domain::connection::ConnectionState;
use agentdesk_viewer::{ContainerLogViewer, HttpContainerLogRepository, ViewerEvent};
use anyhow::Result;
use clap::Subcommand;
use colored::*;
use tokio::sync::broadcast::error::RecvError;

use super::shutdown_signal;
use crate::config::Config;
use crate::render::connection_banner;

/// Container subcommands
#[derive(Subcommand)]
pub enum ContainerCommands {
    /// Follow sandbox container output
    Tail {
        /// Server-side batching window in seconds
        #[arg(long)]
        granularity: Option<u64>,
    },
}

/// Handle container commands
pub async fn handle_container_command(command: ContainerCommands, config: &Config) -> Result<()> {
    match command {
        ContainerCommands::Tail { granularity } => tail_container(config, granularity).await,
    }
}

/// Follow container output until Ctrl-C
async fn tail_container(config: &Config, granularity: Option<u64>) -> Result<()> {
    let repository = HttpContainerLogRepository::new(config.client());
    let mut viewer = ContainerLogViewer::new(Arc::new(repository), config.viewer_config()?);
    let mut events = viewer.subscribe();
    viewer.start(granularity);

    let mut shown_state: Option<ConnectionState> = None;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Ok(ViewerEvent::Appended(lines)) => {
                    for line in lines.iter() {
                        println!("{}", line);
                    }
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
                Ok(ViewerEvent::Replaced(_) | ViewerEvent::Cleared) => {}
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
