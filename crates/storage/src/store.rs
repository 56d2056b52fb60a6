// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable store boundary
//!
//! A store hands out exclusive write transactions. At most one write
//! transaction is open against a store at a time; a caller that cannot get
//! the write lock within the store's own timeout sees
//! [`StoreError::Contention`], which is the only error worth retrying.

use chrono::{DateTime, Utc};
use sluice_core::{AllocationId, AllocationRecord, Event, EventRecord, ItemId};
use std::sync::Arc;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is locked by another writer")]
    Contention,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stock for {0} is already at zero")]
    BelowFloor(ItemId),
    #[error("no stock ledger row for {0}")]
    UnknownItem(ItemId),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("database error: {0}")]
    Database(rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether another writer held the lock; the only retryable failure
    pub fn is_contention(&self) -> bool {
        matches!(self, StoreError::Contention)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                StoreError::Contention
            }
            _ => StoreError::Database(e),
        }
    }
}

/// One exclusive write transaction
///
/// Dropping a transaction without calling [`commit`](WriteTxn::commit)
/// rolls it back.
pub trait WriteTxn {
    /// Current stock for `item`, `None` when the row does not exist
    fn remaining(&mut self, item: &ItemId) -> Result<Option<u64>, StoreError>;

    /// Take one unit of `item`, returning the stock left afterwards
    ///
    /// Fails with [`StoreError::BelowFloor`] rather than going below zero.
    fn decrement(&mut self, item: &ItemId) -> Result<u64, StoreError>;

    fn insert_allocation(
        &mut self,
        item: &ItemId,
        issued_at: DateTime<Utc>,
    ) -> Result<AllocationId, StoreError>;

    /// Insert every event as one batch, returning how many rows were written
    fn insert_events(&mut self, events: &[Event]) -> Result<usize, StoreError>;

    fn commit(self) -> Result<(), StoreError>;

    fn rollback(self) -> Result<(), StoreError>;
}

/// A transactional, single-writer-at-a-time persistence backend
pub trait DurableStore: Send + Sync + 'static {
    type Txn<'a>: WriteTxn
    where
        Self: 'a;

    /// Open an exclusive write transaction
    fn begin_immediate(&self) -> Result<Self::Txn<'_>, StoreError>;

    /// Insert a stock row unless one already exists; true when inserted
    fn seed_stock(&self, item: &ItemId, remaining: u64) -> Result<bool, StoreError>;

    fn stock(&self, item: &ItemId) -> Result<Option<u64>, StoreError>;

    fn allocations(&self, item: &ItemId) -> Result<Vec<AllocationRecord>, StoreError>;

    /// Every persisted event in insertion order
    fn events(&self) -> Result<Vec<EventRecord>, StoreError>;
}

impl<S: DurableStore> DurableStore for Arc<S> {
    type Txn<'a> = S::Txn<'a> where Self: 'a;

    fn begin_immediate(&self) -> Result<Self::Txn<'_>, StoreError> {
        (**self).begin_immediate()
    }

    fn seed_stock(&self, item: &ItemId, remaining: u64) -> Result<bool, StoreError> {
        (**self).seed_stock(item, remaining)
    }

    fn stock(&self, item: &ItemId) -> Result<Option<u64>, StoreError> {
        (**self).stock(item)
    }

    fn allocations(&self, item: &ItemId) -> Result<Vec<AllocationRecord>, StoreError> {
        (**self).allocations(item)
    }

    fn events(&self) -> Result<Vec<EventRecord>, StoreError> {
        (**self).events()
    }
}

/// Run `f` inside one write transaction
///
/// Commits when `f` succeeds and rolls back when it fails. A failed rollback
/// is logged; the error from `f` is the one returned.
pub fn with_immediate<'a, S, T, F>(store: &'a S, f: F) -> Result<T, StoreError>
where
    S: DurableStore,
    F: FnOnce(&mut S::Txn<'a>) -> Result<T, StoreError>,
{
    let mut txn = store.begin_immediate()?;
    match f(&mut txn) {
        Ok(value) => {
            txn.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback() {
                tracing::warn!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}
