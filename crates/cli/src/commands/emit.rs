// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sluice emit <subject-id>` - Submit an event for buffered persistence

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Args;
use serde_json::{json, Value};

use crate::client::DaemonClient;

#[derive(Args)]
pub struct EmitArgs {
    /// Subject the event is about
    #[arg(
        allow_negative_numbers = true,
        required_unless_present = "raw",
        conflicts_with = "raw"
    )]
    pub subject_id: Option<i64>,

    /// Event time as RFC 3339 (defaults to now)
    #[arg(long, conflicts_with = "raw")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Event metadata as JSON
    #[arg(short, long, conflicts_with = "raw")]
    pub metadata: Option<String>,

    /// Send this JSON payload unchanged
    #[arg(long)]
    pub raw: Option<String>,
}

pub async fn handle(args: EmitArgs, client: &DaemonClient) -> Result<()> {
    let payload = build_payload(args, Utc::now())?;
    let reply = client.ingest(payload).await?;
    super::finish(&reply)
}

/// Assemble the wire payload; the daemon does the validation
pub fn build_payload(args: EmitArgs, now: DateTime<Utc>) -> Result<Value> {
    if let Some(raw) = args.raw {
        return serde_json::from_str(&raw).context("--raw is not valid JSON");
    }

    let mut payload = json!({
        "subject_id": args.subject_id,
        "timestamp": args
            .timestamp
            .unwrap_or(now)
            .to_rfc3339_opts(SecondsFormat::Micros, true),
    });
    if let Some(metadata) = args.metadata {
        let metadata: Value =
            serde_json::from_str(&metadata).context("--metadata is not valid JSON")?;
        payload["metadata"] = metadata;
    }
    Ok(payload)
}

#[cfg(test)]
#[path = "emit_tests.rs"]
mod tests;
