// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fault-injecting store wrapper for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::store::{DurableStore, StoreError, WriteTxn};
use chrono::{DateTime, Utc};
use sluice_core::{AllocationId, AllocationRecord, Event, EventRecord, ItemId};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Faults {
    contend_begins: u32,
    contend_commits: u32,
    fail_begins: u32,
    fail_commits: u32,
    begins: u32,
    commits: u32,
}

impl Faults {
    fn take(counter: &mut u32) -> bool {
        if *counter == 0 {
            return false;
        }
        *counter -= 1;
        true
    }
}

/// Store wrapper that fails the next N begins or commits on request
///
/// Clones share the same fault plan and counters.
pub struct FaultyStore<S> {
    inner: Arc<S>,
    faults: Arc<Mutex<Faults>>,
}

impl<S> Clone for FaultyStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            faults: Arc::clone(&self.faults),
        }
    }
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
            faults: Arc::new(Mutex::new(Faults::default())),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The next `n` begins report the write lock as held elsewhere
    pub fn contend_next_begins(&self, n: u32) {
        self.faults().contend_begins = n;
    }

    /// The next `n` commits roll back and report contention
    pub fn contend_next_commits(&self, n: u32) {
        self.faults().contend_commits = n;
    }

    /// The next `n` begins fail with a non-retryable error
    pub fn fail_next_begins(&self, n: u32) {
        self.faults().fail_begins = n;
    }

    /// The next `n` commits roll back and fail with a non-retryable error
    pub fn fail_next_commits(&self, n: u32) {
        self.faults().fail_commits = n;
    }

    /// Begin attempts seen, including injected failures
    pub fn begins(&self) -> u32 {
        self.faults().begins
    }

    /// Commits that reached the inner store and succeeded
    pub fn commits(&self) -> u32 {
        self.faults().commits
    }
}

impl<S: DurableStore> DurableStore for FaultyStore<S> {
    type Txn<'a> = FaultyTxn<'a, S> where Self: 'a;

    fn begin_immediate(&self) -> Result<Self::Txn<'_>, StoreError> {
        {
            let mut faults = self.faults();
            faults.begins += 1;
            if Faults::take(&mut faults.contend_begins) {
                return Err(StoreError::Contention);
            }
            if Faults::take(&mut faults.fail_begins) {
                return Err(StoreError::Unavailable("injected begin failure".to_string()));
            }
        }
        Ok(FaultyTxn {
            inner: self.inner.begin_immediate()?,
            faults: &self.faults,
        })
    }

    fn seed_stock(&self, item: &ItemId, remaining: u64) -> Result<bool, StoreError> {
        self.inner.seed_stock(item, remaining)
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

/// Transaction handed out by [`FaultyStore`]
pub struct FaultyTxn<'a, S: DurableStore + 'a> {
    inner: S::Txn<'a>,
    faults: &'a Mutex<Faults>,
}

impl<'a, S: DurableStore + 'a> WriteTxn for FaultyTxn<'a, S> {
    fn remaining(&mut self, item: &ItemId) -> Result<Option<u64>, StoreError> {
        self.inner.remaining(item)
    }

    fn decrement(&mut self, item: &ItemId) -> Result<u64, StoreError> {
        self.inner.decrement(item)
    }

    fn insert_allocation(
        &mut self,
        item: &ItemId,
        issued_at: DateTime<Utc>,
    ) -> Result<AllocationId, StoreError> {
        self.inner.insert_allocation(item, issued_at)
    }

    fn insert_events(&mut self, events: &[Event]) -> Result<usize, StoreError> {
        self.inner.insert_events(events)
    }

    fn commit(self) -> Result<(), StoreError> {
        let injected = {
            let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
            if Faults::take(&mut faults.contend_commits) {
                Some(StoreError::Contention)
            } else if Faults::take(&mut faults.fail_commits) {
                Some(StoreError::Unavailable("injected commit failure".to_string()))
            } else {
                None
            }
        };
        if let Some(error) = injected {
            self.inner.rollback()?;
            return Err(error);
        }

        self.inner.commit()?;
        self.faults
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .commits += 1;
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        self.inner.rollback()
    }
}
