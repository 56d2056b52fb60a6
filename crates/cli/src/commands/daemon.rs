// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sluice daemon` - Start, stop and inspect the background daemon

use anyhow::Result;
use clap::{Args, Subcommand};
use sluice_daemon::Paths;

use crate::client::{self, ClientError, DaemonClient};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon in the background
    Start,
    /// Stop the daemon
    Stop,
    /// Show whether the daemon is running
    Status,
    /// Run the daemon in the foreground
    Run,
}

pub async fn handle(args: DaemonArgs, paths: Paths) -> Result<()> {
    match args.command {
        DaemonCommand::Start => {
            if client::daemon_start(&paths).await? {
                println!("Daemon started");
            } else {
                println!("Daemon already running");
            }
        }
        DaemonCommand::Stop => {
            if client::daemon_stop(&paths).await? {
                println!("Daemon stopped");
            } else {
                println!("Daemon not running");
            }
        }
        DaemonCommand::Status => status(&paths).await?,
        DaemonCommand::Run => sluice_daemon::run(paths).await?,
    }
    Ok(())
}

async fn status(paths: &Paths) -> Result<()> {
    let client = match DaemonClient::connect(paths) {
        Ok(client) => client,
        Err(ClientError::DaemonNotRunning) => {
            println!("Daemon not running");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // A leftover socket with nobody behind it reads as not running
    let version = match client.hello().await {
        Ok(version) => version,
        Err(ClientError::Io(_)) => {
            println!("Daemon not running");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let status = client.status().await?;

    println!("Status: running");
    println!("Version: {}", version);
    if let Some(pid) = client::read_daemon_pid(paths) {
        println!("Pid: {}", pid);
    }
    println!("Uptime: {}s", status.uptime_secs);
    println!("Pending events: {}", status.pending_events);
    Ok(())
}
