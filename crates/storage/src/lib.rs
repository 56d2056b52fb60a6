// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! sluice-storage: durable persistence for stock, allocations and events
//!
//! [`SqliteStore`] is the production backend. [`MemoryStore`] offers the
//! same transactional contract inside one process. [`OutageStore`] and
//! [`TracedStore`] wrap any backend.

pub mod memory;
pub mod outage;
pub mod sqlite;
pub mod store;
pub mod traced;

#[cfg(any(test, feature = "test-support"))]
pub mod fault;

pub use memory::{MemoryStore, MemoryTxn};
pub use outage::{OutageStore, OutageSwitch};
pub use sqlite::{SqliteStore, SqliteTxn};
pub use store::{with_immediate, DurableStore, StoreError, WriteTxn};
pub use traced::{TracedStore, TracedTxn};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fault::{FaultyStore, FaultyTxn};
