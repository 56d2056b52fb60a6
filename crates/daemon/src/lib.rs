// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sluice daemon library
//!
//! Exposes the IPC protocol for the CLI and the foreground entry point the
//! `sluiced` binary and `sluice daemon run` share.

pub mod lifecycle;
pub mod paths;
pub mod protocol;
mod run;
pub mod server;

pub use lifecycle::{startup, DaemonState, LifecycleError};
pub use paths::Paths;
pub use protocol::{ProtocolError, Request, Response, StockLevel};
pub use run::{run, serve, STARTUP_ERROR_PREFIX, STARTUP_MARKER_PREFIX};
