// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulated store outage
//!
//! While the switch is engaged every new write transaction fails with
//! [`StoreError::Unavailable`]. Reads pass through so operators can still
//! inspect the store.

use crate::store::{DurableStore, StoreError};
use sluice_core::{AllocationRecord, EventRecord, ItemId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared on/off switch for a simulated outage
#[derive(Debug, Clone, Default)]
pub struct OutageSwitch {
    engaged: Arc<AtomicBool>,
}

impl OutageSwitch {
    pub fn new(engaged: bool) -> Self {
        Self {
            engaged: Arc::new(AtomicBool::new(engaged)),
        }
    }

    pub fn engage(&self) {
        self.set(true);
    }

    pub fn restore(&self) {
        self.set(false);
    }

    pub fn set(&self, engaged: bool) {
        let was = self.engaged.swap(engaged, Ordering::SeqCst);
        if was != engaged {
            tracing::warn!(engaged, "store outage simulation toggled");
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }
}

/// Store wrapper that refuses writes while its switch is engaged
pub struct OutageStore<S> {
    inner: S,
    switch: OutageSwitch,
}

impl<S> OutageStore<S> {
    pub fn new(inner: S, switch: OutageSwitch) -> Self {
        Self { inner, switch }
    }

    pub fn switch(&self) -> &OutageSwitch {
        &self.switch
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: DurableStore> DurableStore for OutageStore<S> {
    type Txn<'a> = S::Txn<'a> where Self: 'a;

    fn begin_immediate(&self) -> Result<Self::Txn<'_>, StoreError> {
        if self.switch.is_engaged() {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        self.inner.begin_immediate()
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
