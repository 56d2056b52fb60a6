// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sluice status` - Stock levels and ingestion backlog

use anyhow::Result;
use clap::Args;

use crate::client::DaemonClient;
use crate::output::{self, OutputFormat};

#[derive(Args)]
pub struct StatusArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub output: OutputFormat,
}

pub async fn handle(args: StatusArgs, client: &DaemonClient) -> Result<()> {
    let status = client.status().await?;
    output::print(&status, args.output);
    Ok(())
}
