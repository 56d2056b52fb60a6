// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sluice-core: shared types for the sluice allocation and ingestion engine
//!
//! This crate provides:
//! - Domain types for stock allocation and ingested events
//! - A clock abstraction so waiting can be faked in tests
//! - The bounded retry policy shared by the allocator and flush scheduler
//! - TOML configuration

pub mod allocation;
pub mod clock;
pub mod config;
pub mod event;
pub mod retry;

// Re-exports
pub use allocation::{Allocation, AllocationId, AllocationRecord, ItemId, PurchaseOutcome};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError, FlushConfig, StockSeed, StoreConfig};
pub use event::{Event, EventError, EventRecord};
pub use retry::{retry, Backoff, RetryError, RetryPolicy};
