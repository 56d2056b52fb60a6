// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-stock allocator
//!
//! Each purchase attempt is one read-decide-decrement-commit sequence inside
//! a single exclusive write transaction. The store serializes those
//! transactions, so no two committed decrements ever observe the same
//! pre-decrement stock. Write contention aborts the attempt and the whole
//! sequence is retried under the configured [`RetryPolicy`].

use crate::blocking::run_blocking;
use chrono::Utc;
use sluice_core::{retry, Allocation, Clock, ItemId, PurchaseOutcome, RetryPolicy};
use sluice_storage::{with_immediate, DurableStore, StoreError, WriteTxn};
use std::sync::Arc;
use tracing::Instrument;

pub struct Allocator<S, C> {
    store: Arc<S>,
    policy: RetryPolicy,
    clock: C,
}

impl<S, C: Clone> Clone for Allocator<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
            clock: self.clock.clone(),
        }
    }
}

impl<S: DurableStore, C: Clock> Allocator<S, C> {
    pub fn new(store: Arc<S>, policy: RetryPolicy, clock: C) -> Self {
        Self {
            store,
            policy,
            clock,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Try to take one unit of `item`
    ///
    /// A missing stock row counts as sold out. Only write contention is
    /// retried; any other store failure returns `Unavailable` at once.
    pub async fn attempt_purchase(&self, item: &ItemId) -> PurchaseOutcome {
        let span = tracing::info_span!("allocator.purchase", item = %item);

        let result = retry(
            &self.policy,
            &self.clock,
            StoreError::is_contention,
            |attempt| {
                let store = Arc::clone(&self.store);
                let item = item.clone();
                tracing::trace!(attempt, "purchase attempt");
                run_blocking(move || purchase_once(&*store, &item))
            },
        )
        .instrument(span.clone())
        .await;

        let _guard = span.enter();
        match result {
            Ok(Some(allocation)) => {
                tracing::info!(
                    allocation_id = %allocation.id,
                    remaining = allocation.remaining,
                    "allocated"
                );
                PurchaseOutcome::Allocated(allocation)
            }
            Ok(None) => {
                tracing::debug!("sold out");
                PurchaseOutcome::Exhausted
            }
            Err(e) => {
                tracing::warn!(attempts = e.attempts(), error = %e, "store unavailable");
                PurchaseOutcome::Unavailable
            }
        }
    }
}

/// One transactional purchase; `None` when there is nothing left to sell
fn purchase_once<S: DurableStore>(
    store: &S,
    item: &ItemId,
) -> Result<Option<Allocation>, StoreError> {
    with_immediate(store, |txn| {
        match txn.remaining(item)? {
            None | Some(0) => return Ok(None),
            Some(_) => {}
        }

        let remaining = txn.decrement(item)?;
        let issued_at = Utc::now();
        let id = txn.insert_allocation(item, issued_at)?;

        Ok(Some(Allocation {
            id,
            item_id: item.clone(),
            remaining,
            issued_at,
        }))
    })
}

#[cfg(test)]
#[path = "allocator_tests.rs"]
mod tests;
