// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sluice allocation and ingestion engine

mod admission;
mod allocator;
mod blocking;
mod buffer;
mod flusher;

pub use admission::{Admission, Reply, Status};
pub use allocator::Allocator;
pub use buffer::{Accepted, Batch, IngestionBuffer};
pub use flusher::{FlushReport, FlushScheduler};
