// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sluice buy <item>` - Take one unit of stock

use anyhow::Result;
use clap::Args;
use sluice_core::ItemId;

use crate::client::DaemonClient;

#[derive(Args)]
pub struct BuyArgs {
    /// Item to buy
    pub item: String,
}

pub async fn handle(args: BuyArgs, client: &DaemonClient) -> Result<()> {
    let reply = client.purchase(ItemId::new(args.item)).await?;
    super::finish(&reply)
}
