// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingested events
//!
//! An event is an opaque payload with two required fields, a subject id and
//! a timestamp. Everything else travels along as auxiliary data and is
//! persisted as serialized JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Field names accepted for the subject id, in lookup order
const SUBJECT_FIELDS: [&str; 2] = ["subject_id", "user_id"];

/// Errors from validating an inbound payload
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("event payload must be a JSON object")]
    NotAnObject,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// An accepted event awaiting persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(alias = "user_id")]
    pub subject_id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Value,
    /// Top-level fields other than the required ones and `metadata`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    pub fn new(subject_id: i64, timestamp: DateTime<Utc>, metadata: Value) -> Self {
        Self {
            subject_id,
            timestamp,
            metadata,
            extra: Map::new(),
        }
    }

    /// Validate an arbitrary JSON payload into an event
    pub fn from_payload(payload: Value) -> Result<Self, EventError> {
        let Value::Object(mut fields) = payload else {
            return Err(EventError::NotAnObject);
        };

        let subject = SUBJECT_FIELDS
            .iter()
            .find_map(|name| fields.remove(*name))
            .ok_or(EventError::MissingField("subject_id"))?;
        let subject_id = subject.as_i64().ok_or_else(|| EventError::InvalidField {
            field: "subject_id",
            reason: format!("expected an integer, got {}", subject),
        })?;

        let timestamp = fields
            .remove("timestamp")
            .ok_or(EventError::MissingField("timestamp"))?;
        let timestamp = parse_timestamp(&timestamp)?;

        let metadata = fields.remove("metadata").unwrap_or(Value::Null);

        Ok(Self {
            subject_id,
            timestamp,
            metadata,
            extra: fields,
        })
    }

    /// Auxiliary data as stored alongside the event record
    ///
    /// Payloads that only carry `metadata` store it as-is. Once extra
    /// top-level fields exist, the stored object keeps them next to a
    /// `metadata` key that is always present, `null` included.
    pub fn auxiliary(&self) -> Value {
        if self.extra.is_empty() {
            return self.metadata.clone();
        }
        let mut aux = self.extra.clone();
        aux.insert("metadata".to_string(), self.metadata.clone());
        Value::Object(aux)
    }
}

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, EventError> {
    let raw = value.as_str().ok_or_else(|| EventError::InvalidField {
        field: "timestamp",
        reason: format!("expected an RFC 3339 string, got {}", value),
    })?;
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| EventError::InvalidField {
            field: "timestamp",
            reason: e.to_string(),
        })
}

/// A persisted event row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: u64,
    pub subject_id: i64,
    pub timestamp: DateTime<Utc>,
    pub metadata: Value,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
