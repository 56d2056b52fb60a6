// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic flush of the ingestion buffer into the store
//!
//! Every period the scheduler drains up to `batch_size` events and writes
//! them in one transaction. On failure the batch goes back to the front of
//! the pending queue before the cycle ends, then the scheduler pauses for
//! `failure_pause` on top of the regular period.

use crate::blocking::run_blocking;
use crate::buffer::{Batch, IngestionBuffer};
use sluice_core::{retry, Clock, FlushConfig};
use sluice_storage::{with_immediate, DurableStore, StoreError, WriteTxn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What one flush cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushReport {
    /// Nothing was pending
    Idle,
    /// A batch was persisted
    Flushed { count: usize },
    /// The batch failed and is pending again
    Requeued { count: usize, error: String },
}

pub struct FlushScheduler<S, C> {
    store: Arc<S>,
    buffer: IngestionBuffer,
    config: FlushConfig,
    clock: C,
}

impl<S: DurableStore, C: Clock> FlushScheduler<S, C> {
    pub fn new(store: Arc<S>, buffer: IngestionBuffer, config: FlushConfig, clock: C) -> Self {
        Self {
            store,
            buffer,
            config,
            clock,
        }
    }

    pub fn buffer(&self) -> &IngestionBuffer {
        &self.buffer
    }

    /// Drain one batch and try to persist it
    ///
    /// Contention is retried under `config.retry` while the batch stays in
    /// flight; once that gives up the batch is requeued before returning.
    pub async fn flush_once(&self) -> FlushReport {
        let batch = self.buffer.drain(self.config.batch_size);
        if batch.is_empty() {
            tracing::trace!("nothing to flush");
            return FlushReport::Idle;
        }
        let count = batch.len();
        let batch = Arc::new(batch);

        let result = retry(
            &self.config.retry,
            &self.clock,
            StoreError::is_contention,
            |_attempt| {
                let store = Arc::clone(&self.store);
                let batch = Arc::clone(&batch);
                run_blocking(move || {
                    with_immediate(&*store, |txn| txn.insert_events(batch.events()))
                })
            },
        )
        .await;

        match result {
            Ok(written) => {
                tracing::info!(count = written, pending = self.buffer.len(), "flushed batch");
                FlushReport::Flushed { count: written }
            }
            Err(e) => {
                // every attempt has finished, so this is the only handle left
                let batch: Batch = Arc::unwrap_or_clone(batch);
                self.buffer.requeue(batch);
                tracing::warn!(
                    count,
                    attempts = e.attempts(),
                    pending = self.buffer.len(),
                    error = %e,
                    "flush failed, batch requeued"
                );
                FlushReport::Requeued {
                    count,
                    error: e.into_inner().to_string(),
                }
            }
        }
    }

    /// Flush on every period until `cancel` fires
    ///
    /// Cancellation is only observed between cycles, so an in-flight
    /// transaction always finishes. Returns the number of events left
    /// pending, which are not persisted.
    pub async fn run(&self, cancel: CancellationToken) -> usize {
        tracing::info!(
            period_ms = self.config.period.as_millis() as u64,
            batch_size = self.config.batch_size,
            "flush scheduler started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.clock.sleep(self.config.period) => {}
            }

            if let FlushReport::Requeued { .. } = self.flush_once().await {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = self.clock.sleep(self.config.failure_pause) => {}
                }
            }
        }

        let pending = self.buffer.len();
        if pending > 0 {
            tracing::warn!(pending, "flush scheduler stopped; pending events were not persisted");
        } else {
            tracing::info!("flush scheduler stopped");
        }
        pending
    }
}

#[cfg(test)]
#[path = "flusher_tests.rs"]
mod tests;
