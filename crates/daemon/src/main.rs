// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sluice daemon (sluiced)
//!
//! Background process that owns the stock store, the ingestion buffer and
//! the flush task.

use sluice_daemon::{LifecycleError, Paths};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let paths = Paths::from_env().ok_or(LifecycleError::NoStateDir)?;
    sluice_daemon::run(paths).await?;
    Ok(())
}
