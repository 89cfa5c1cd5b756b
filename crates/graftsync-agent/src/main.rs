#![warn(missing_docs)]

//! `graftsync` agent binary.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use graftsync_agent::cli::Cli;
use graftsync_agent::{load_hierarchies, Agent, AgentConfig};
use graftsync_hier::{LocalFileSystemApi, TracingDiagnostics};
use graftsync_route::SystemClock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    if cli.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    tracing::info!("graftsync starting...");

    let config = if cli.config.exists() {
        AgentConfig::from_file(&cli.config)?
    } else {
        anyhow::bail!("Config file not found: {}", cli.config.display());
    };

    let fs = Arc::new(LocalFileSystemApi::new());
    if cli.check {
        let hierarchies = load_hierarchies(&config, fs, Arc::new(TracingDiagnostics))?;
        for root in hierarchies.named_roots() {
            println!("{root}");
        }
        for graft in hierarchies.grafts() {
            println!("  {graft}");
        }
        println!("configuration OK");
        return Ok(());
    }

    let agent = Agent::new(&config, fs, Vec::new(), Arc::new(SystemClock))?;
    agent
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    tracing::info!("graftsync stopped");
    Ok(())
}
