// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory ingestion buffer
//!
//! The pending queue is FIFO and guarded by one mutex that is held only to
//! push, drain or requeue. It is never held across persistence. There is no
//! bound on its size: under a sustained store outage it grows without limit,
//! and crossing the configured warning depth is logged.

use serde::Serialize;
use sluice_core::Event;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Acknowledgement for an enqueued event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Accepted {
    /// Pending depth right after the enqueue
    pub depth: usize,
}

/// Events drained for one persistence attempt
///
/// While a batch exists its events are in neither the pending queue nor the
/// store. A failed attempt hands the whole batch back via
/// [`IngestionBuffer::requeue`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    events: Vec<Event>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl From<Vec<Event>> for Batch {
    fn from(events: Vec<Event>) -> Self {
        Self { events }
    }
}

#[derive(Debug)]
struct Pending {
    queue: VecDeque<Event>,
    warn_depth: usize,
    over_warn_depth: bool,
}

impl Pending {
    fn check_depth(&mut self) {
        let depth = self.queue.len();
        if depth >= self.warn_depth && !self.over_warn_depth {
            self.over_warn_depth = true;
            tracing::warn!(
                depth,
                warn_depth = self.warn_depth,
                "pending queue is growing; events are not being persisted"
            );
        } else if depth < self.warn_depth && self.over_warn_depth {
            self.over_warn_depth = false;
            tracing::info!(depth, "pending queue back below warning depth");
        }
    }
}

/// Shared handle to the pending queue; clones see the same queue
#[derive(Debug, Clone)]
pub struct IngestionBuffer {
    pending: Arc<Mutex<Pending>>,
}

impl IngestionBuffer {
    pub fn new(warn_depth: usize) -> Self {
        Self {
            pending: Arc::new(Mutex::new(Pending {
                queue: VecDeque::new(),
                warn_depth: warn_depth.max(1),
                over_warn_depth: false,
            })),
        }
    }

    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an event; never waits on persistence
    pub fn enqueue(&self, event: Event) -> Accepted {
        let mut pending = self.pending();
        pending.queue.push_back(event);
        pending.check_depth();
        Accepted {
            depth: pending.queue.len(),
        }
    }

    /// Take up to `max` events from the front of the queue
    pub fn drain(&self, max: usize) -> Batch {
        let mut pending = self.pending();
        let take = max.min(pending.queue.len());
        let events: Vec<Event> = pending.queue.drain(..take).collect();
        pending.check_depth();
        Batch { events }
    }

    /// Return a failed batch to the front of the queue in the order it was drained
    pub fn requeue(&self, batch: Batch) {
        let count = batch.len();
        let mut pending = self.pending();
        for event in batch.events.into_iter().rev() {
            pending.queue.push_front(event);
        }
        pending.check_depth();
        tracing::debug!(count, depth = pending.queue.len(), "batch requeued");
    }

    pub fn len(&self) -> usize {
        self.pending().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().queue.is_empty()
    }

    /// Copy of every pending event, front first
    pub fn snapshot(&self) -> Vec<Event> {
        self.pending().queue.iter().cloned().collect()
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
