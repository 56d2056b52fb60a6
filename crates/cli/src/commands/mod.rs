// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod buy;
pub mod daemon;
pub mod emit;
pub mod outage;
pub mod status;

use anyhow::Result;
use sluice_engine::Reply;

/// One line per reply: `<code> <message>`, plus the allocation id when present
pub fn format_reply(reply: &Reply) -> String {
    match reply.allocation_id {
        Some(id) => format!("{} {} (allocation {})", reply.status, reply.message, id),
        None => format!("{} {}", reply.status, reply.message),
    }
}

/// Print a successful reply; anything else becomes the command's error
pub fn finish(reply: &Reply) -> Result<()> {
    let line = format_reply(reply);
    if reply.status.is_success() {
        println!("{}", line);
        Ok(())
    } else {
        anyhow::bail!(line)
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
