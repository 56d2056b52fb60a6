// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stock allocation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a stock ledger row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Store-generated identifier of an allocation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationId(pub u64);

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A successful purchase as seen by the committing transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub item_id: ItemId,
    /// Stock left after this allocation's decrement
    pub remaining: u64,
    pub issued_at: DateTime<Utc>,
}

/// A persisted allocation row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub id: AllocationId,
    pub item_id: ItemId,
    pub issued_at: DateTime<Utc>,
}

/// Result of a single purchase attempt
///
/// `Unavailable` means the store could not be reached or stayed contended
/// past the retry ceiling; the caller may try again. It is never used for
/// an empty stock row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Allocated(Allocation),
    Exhausted,
    Unavailable,
}

impl PurchaseOutcome {
    pub fn is_allocated(&self) -> bool {
        matches!(self, PurchaseOutcome::Allocated(_))
    }

    pub fn allocation_id(&self) -> Option<AllocationId> {
        match self {
            PurchaseOutcome::Allocated(allocation) => Some(allocation.id),
            _ => None,
        }
    }
}
