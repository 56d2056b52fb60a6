// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process durable store
//!
//! A write transaction holds the store's mutex from `begin_immediate` until
//! it commits, rolls back or is dropped, so writers are serialized the same
//! way `BEGIN IMMEDIATE` serializes them in SQLite. Changes are staged in
//! the transaction and applied only on commit.
//!
//! Nothing outlives the process; use [`SqliteStore`](crate::SqliteStore)
//! when more than one process shares the data.

use crate::store::{DurableStore, StoreError, WriteTxn};
use chrono::{DateTime, Utc};
use sluice_core::{AllocationId, AllocationRecord, Event, EventRecord, ItemId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    stock: HashMap<ItemId, u64>,
    allocations: Vec<AllocationRecord>,
    events: Vec<EventRecord>,
    next_allocation_id: u64,
    next_event_id: u64,
}

/// Mutex-backed store for tests and single-process use
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DurableStore for MemoryStore {
    type Txn<'a> = MemoryTxn<'a>;

    fn begin_immediate(&self) -> Result<MemoryTxn<'_>, StoreError> {
        Ok(MemoryTxn {
            state: self.state(),
            stock: HashMap::new(),
            allocations: Vec::new(),
            events: Vec::new(),
        })
    }

    fn seed_stock(&self, item: &ItemId, remaining: u64) -> Result<bool, StoreError> {
        let mut state = self.state();
        if state.stock.contains_key(item) {
            return Ok(false);
        }
        state.stock.insert(item.clone(), remaining);
        Ok(true)
    }

    fn stock(&self, item: &ItemId) -> Result<Option<u64>, StoreError> {
        Ok(self.state().stock.get(item).copied())
    }

    fn allocations(&self, item: &ItemId) -> Result<Vec<AllocationRecord>, StoreError> {
        Ok(self
            .state()
            .allocations
            .iter()
            .filter(|record| &record.item_id == item)
            .cloned()
            .collect())
    }

    fn events(&self) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self.state().events.clone())
    }
}

/// Exclusive transaction over a [`MemoryStore`]
pub struct MemoryTxn<'a> {
    state: MutexGuard<'a, MemoryState>,
    stock: HashMap<ItemId, u64>,
    allocations: Vec<(ItemId, DateTime<Utc>)>,
    events: Vec<Event>,
}

impl WriteTxn for MemoryTxn<'_> {
    fn remaining(&mut self, item: &ItemId) -> Result<Option<u64>, StoreError> {
        Ok(self
            .stock
            .get(item)
            .or_else(|| self.state.stock.get(item))
            .copied())
    }

    fn decrement(&mut self, item: &ItemId) -> Result<u64, StoreError> {
        match self.remaining(item)? {
            None => Err(StoreError::UnknownItem(item.clone())),
            Some(0) => Err(StoreError::BelowFloor(item.clone())),
            Some(remaining) => {
                self.stock.insert(item.clone(), remaining - 1);
                Ok(remaining - 1)
            }
        }
    }

    fn insert_allocation(
        &mut self,
        item: &ItemId,
        issued_at: DateTime<Utc>,
    ) -> Result<AllocationId, StoreError> {
        self.allocations.push((item.clone(), issued_at));
        let staged = self.allocations.len() as u64;
        Ok(AllocationId(self.state.next_allocation_id + staged))
    }

    fn insert_events(&mut self, events: &[Event]) -> Result<usize, StoreError> {
        // Serialization failures surface here, not at commit
        for event in events {
            serde_json::to_string(&event.auxiliary())?;
        }
        self.events.extend_from_slice(events);
        Ok(events.len())
    }

    fn commit(self) -> Result<(), StoreError> {
        let MemoryTxn {
            mut state,
            stock,
            allocations,
            events,
        } = self;

        state.stock.extend(stock);
        for (item_id, issued_at) in allocations {
            state.next_allocation_id += 1;
            let id = AllocationId(state.next_allocation_id);
            state.allocations.push(AllocationRecord {
                id,
                item_id,
                issued_at,
            });
        }
        for event in events {
            state.next_event_id += 1;
            let record = EventRecord {
                id: state.next_event_id,
                subject_id: event.subject_id,
                timestamp: event.timestamp,
                metadata: event.auxiliary(),
            };
            state.events.push(record);
        }
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
