// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sluice outage on|off` - Toggle the simulated store outage

use anyhow::Result;
use clap::{Args, ValueEnum};

use crate::client::DaemonClient;

#[derive(Args)]
pub struct OutageArgs {
    pub state: OutageState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutageState {
    On,
    Off,
}

pub async fn handle(args: OutageArgs, client: &DaemonClient) -> Result<()> {
    let enabled = args.state == OutageState::On;
    client.set_outage(enabled).await?;
    if enabled {
        println!("Store outage engaged; writes will fail until restored");
    } else {
        println!("Store outage restored");
    }
    Ok(())
}
