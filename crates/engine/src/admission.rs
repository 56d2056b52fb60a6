// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission façade
//!
//! Maps allocator outcomes and ingestion acknowledgements to HTTP-style
//! status codes. Neither call waits on the flush scheduler.

use crate::allocator::Allocator;
use crate::buffer::IngestionBuffer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sluice_core::{AllocationId, Clock, Event, ItemId, PurchaseOutcome};
use sluice_storage::DurableStore;
use std::fmt;

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Accepted,
    BadRequest,
    Gone,
    InternalError,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Accepted => 202,
            Status::BadRequest => 400,
            Status::Gone => 410,
            Status::InternalError => 500,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Status::Ok | Status::Accepted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Reply returned to the caller of either path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub status: Status,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_id: Option<AllocationId>,
}

impl Reply {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            allocation_id: None,
        }
    }

    pub fn from_outcome(outcome: &PurchaseOutcome) -> Self {
        match outcome {
            PurchaseOutcome::Allocated(allocation) => Self {
                allocation_id: Some(allocation.id),
                ..Self::new(Status::Ok, "Purchase successful")
            },
            PurchaseOutcome::Exhausted => Self::new(Status::Gone, "Sold out"),
            PurchaseOutcome::Unavailable => Self::new(Status::InternalError, "Error, please retry"),
        }
    }
}

pub struct Admission<S, C> {
    allocator: Allocator<S, C>,
    buffer: IngestionBuffer,
}

impl<S: DurableStore, C: Clock> Admission<S, C> {
    pub fn new(allocator: Allocator<S, C>, buffer: IngestionBuffer) -> Self {
        Self { allocator, buffer }
    }

    pub fn allocator(&self) -> &Allocator<S, C> {
        &self.allocator
    }

    pub fn buffer(&self) -> &IngestionBuffer {
        &self.buffer
    }

    /// 200 with an allocation id, 410 when sold out, 500 when the store
    /// stayed unavailable
    pub async fn purchase(&self, item: &ItemId) -> Reply {
        Reply::from_outcome(&self.allocator.attempt_purchase(item).await)
    }

    /// 202 once the event is pending, 400 when the payload is not an event
    pub fn ingest(&self, payload: Value) -> Reply {
        match Event::from_payload(payload) {
            Ok(event) => {
                let accepted = self.buffer.enqueue(event);
                tracing::trace!(depth = accepted.depth, "event accepted");
                Reply::new(Status::Accepted, "Event accepted")
            }
            Err(e) => {
                tracing::debug!(error = %e, "event rejected");
                Reply::new(Status::BadRequest, e.to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
