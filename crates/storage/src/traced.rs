// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use crate::store::{DurableStore, StoreError, WriteTxn};
use chrono::{DateTime, Utc};
use sluice_core::{AllocationId, AllocationRecord, Event, EventRecord, ItemId};
use std::time::Instant;

/// Wrapper that adds tracing to any DurableStore
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: DurableStore> DurableStore for TracedStore<S> {
    type Txn<'a> = TracedTxn<S::Txn<'a>> where Self: 'a;

    fn begin_immediate(&self) -> Result<Self::Txn<'_>, StoreError> {
        let start = Instant::now();
        let result = self.inner.begin_immediate();
        let wait_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(inner) => {
                tracing::trace!(wait_ms, "write lock acquired");
                Ok(TracedTxn {
                    inner,
                    started: Instant::now(),
                    writes: 0,
                })
            }
            Err(e) if e.is_contention() => {
                tracing::debug!(wait_ms, "write lock contended");
                Err(e)
            }
            Err(e) => {
                tracing::error!(wait_ms, error = %e, "begin failed");
                Err(e)
            }
        }
    }

    fn seed_stock(&self, item: &ItemId, remaining: u64) -> Result<bool, StoreError> {
        let result = self.inner.seed_stock(item, remaining);
        match &result {
            Ok(true) => tracing::info!(item = %item, remaining, "stock seeded"),
            Ok(false) => tracing::debug!(item = %item, "stock row already present"),
            Err(e) => tracing::error!(item = %item, error = %e, "seed failed"),
        }
        result
    }

    fn stock(&self, item: &ItemId) -> Result<Option<u64>, StoreError> {
        self.inner.stock(item)
    }

    fn allocations(&self, item: &ItemId) -> Result<Vec<AllocationRecord>, StoreError> {
        self.inner.allocations(item)
    }

    fn events(&self) -> Result<Vec<EventRecord>, StoreError> {
        self.inner.events()
    }
}

/// Write transaction that logs its outcome and how long it held the lock
pub struct TracedTxn<T> {
    inner: T,
    started: Instant,
    writes: usize,
}

impl<T: WriteTxn> WriteTxn for TracedTxn<T> {
    fn remaining(&mut self, item: &ItemId) -> Result<Option<u64>, StoreError> {
        self.inner.remaining(item)
    }

    fn decrement(&mut self, item: &ItemId) -> Result<u64, StoreError> {
        let result = self.inner.decrement(item);
        if result.is_ok() {
            self.writes += 1;
        }
        result
    }

    fn insert_allocation(
        &mut self,
        item: &ItemId,
        issued_at: DateTime<Utc>,
    ) -> Result<AllocationId, StoreError> {
        let result = self.inner.insert_allocation(item, issued_at);
        if result.is_ok() {
            self.writes += 1;
        }
        result
    }

    fn insert_events(&mut self, events: &[Event]) -> Result<usize, StoreError> {
        let result = self.inner.insert_events(events);
        match &result {
            Ok(count) => self.writes += count,
            Err(e) => tracing::warn!(count = events.len(), error = %e, "event insert failed"),
        }
        result
    }

    fn commit(self) -> Result<(), StoreError> {
        let held_ms = self.started.elapsed().as_millis() as u64;
        let writes = self.writes;
        let result = self.inner.commit();
        match &result {
            Ok(()) => tracing::debug!(writes, held_ms, "committed"),
            Err(e) => tracing::error!(writes, held_ms, error = %e, "commit failed"),
        }
        result
    }

    fn rollback(self) -> Result<(), StoreError> {
        let held_ms = self.started.elapsed().as_millis() as u64;
        let result = self.inner.rollback();
        tracing::debug!(writes = self.writes, held_ms, ok = result.is_ok(), "rolled back");
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
