// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sluice - stock allocation and event ingestion CLI

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{buy, daemon, emit, outage, status};
use sluice_daemon::Paths;
use tracing_subscriber::EnvFilter;

use crate::client::{ClientError, DaemonClient};

#[derive(Parser)]
#[command(
    name = "sluice",
    version,
    about = "Sluice - contended stock allocation and buffered event ingestion"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Buy one unit of an item
    Buy(buy::BuyArgs),
    /// Submit an event
    Emit(emit::EmitArgs),
    /// Show stock levels and pending events
    Status(status::StatusArgs),
    /// Engage or restore the simulated store outage
    Outage(outage::OutageArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = Paths::from_env().ok_or(ClientError::NoStateDir)?;

    // The foreground daemon installs its own file logger
    if let Commands::Daemon(args) = cli.command {
        if !matches!(args.command, daemon::DaemonCommand::Run) {
            init_tracing();
        }
        return daemon::handle(args, paths).await;
    }
    init_tracing();

    let client = DaemonClient::connect_or_start(&paths).await?;

    match cli.command {
        Commands::Buy(args) => buy::handle(args, &client).await?,
        Commands::Emit(args) => emit::handle(args, &client).await?,
        Commands::Status(args) => status::handle(args, &client).await?,
        Commands::Outage(args) => outage::handle(args, &client).await?,
        Commands::Daemon(_) => unreachable!(),
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SLUICE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
