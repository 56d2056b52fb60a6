// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed durable store
//!
//! Every write transaction starts with `BEGIN IMMEDIATE`, which takes the
//! database's single write lock up front. SQLite serializes writers across
//! every connection and every process sharing the file, so read-decide-write
//! sequences never interleave. A writer that waits longer than
//! `busy_timeout` for the lock gets [`StoreError::Contention`].

use crate::store::{DurableStore, StoreError, WriteTxn};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sluice_core::{AllocationId, AllocationRecord, Event, EventRecord, ItemId};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Schema SQL embedded at compile time
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Idle connections kept for reuse
const MAX_IDLE_CONNECTIONS: usize = 16;

/// SQLite store with one connection per open transaction
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
    idle: Mutex<Vec<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `path` and make sure the schema exists
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout,
            idle: Mutex::new(Vec::new()),
        };

        let conn = store.connect()?;
        conn.execute_batch(SCHEMA_SQL)?;
        store.release(conn);

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        if let Some(conn) = self.idle.lock().unwrap_or_else(|e| e.into_inner()).pop() {
            return Ok(conn);
        }

        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("PRAGMA synchronous = NORMAL; PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    fn release(&self, conn: Connection) {
        let mut idle = self.idle.lock().unwrap_or_else(|e| e.into_inner());
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(conn);
        }
    }
}

impl DurableStore for SqliteStore {
    type Txn<'a> = SqliteTxn<'a>;

    fn begin_immediate(&self) -> Result<SqliteTxn<'_>, StoreError> {
        let conn = self.connect()?;
        match conn.execute_batch("BEGIN IMMEDIATE") {
            Ok(()) => Ok(SqliteTxn {
                store: self,
                conn: Some(conn),
            }),
            Err(e) => {
                self.release(conn);
                Err(e.into())
            }
        }
    }

    fn seed_stock(&self, item: &ItemId, remaining: u64) -> Result<bool, StoreError> {
        let remaining = to_sql_count(remaining)?;
        let conn = self.connect()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO stock_ledger (item_id, remaining) VALUES (?1, ?2)",
            params![item.as_str(), remaining],
        );
        self.release(conn);
        Ok(inserted? == 1)
    }

    fn stock(&self, item: &ItemId) -> Result<Option<u64>, StoreError> {
        let conn = self.connect()?;
        let remaining = select_remaining(&conn, item);
        self.release(conn);
        remaining
    }

    fn allocations(&self, item: &ItemId) -> Result<Vec<AllocationRecord>, StoreError> {
        let conn = self.connect()?;
        let rows = query_allocations(&conn, item);
        self.release(conn);

        rows?
            .into_iter()
            .map(|(id, item_id, issued_at)| {
                Ok(AllocationRecord {
                    id: AllocationId(from_sql_count(id)?),
                    item_id: ItemId(item_id),
                    issued_at: parse_time(&issued_at)?,
                })
            })
            .collect()
    }

    fn events(&self) -> Result<Vec<EventRecord>, StoreError> {
        let conn = self.connect()?;
        let rows = query_events(&conn);
        self.release(conn);

        rows?
            .into_iter()
            .map(|(id, subject_id, timestamp, metadata)| {
                Ok(EventRecord {
                    id: from_sql_count(id)?,
                    subject_id,
                    timestamp: parse_time(&timestamp)?,
                    metadata: serde_json::from_str(&metadata)?,
                })
            })
            .collect()
    }
}

/// An open `BEGIN IMMEDIATE` transaction
pub struct SqliteTxn<'a> {
    store: &'a SqliteStore,
    conn: Option<Connection>,
}

impl SqliteTxn<'_> {
    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("transaction already finished".to_string()))
    }

    fn finish(&mut self, sql: &str) -> Result<(), StoreError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        match conn.execute_batch(sql) {
            Ok(()) => {
                self.store.release(conn);
                Ok(())
            }
            Err(e) => {
                // A failed COMMIT leaves the transaction open
                if conn.execute_batch("ROLLBACK").is_ok() {
                    self.store.release(conn);
                }
                Err(e.into())
            }
        }
    }
}

impl WriteTxn for SqliteTxn<'_> {
    fn remaining(&mut self, item: &ItemId) -> Result<Option<u64>, StoreError> {
        select_remaining(self.conn()?, item)
    }

    fn decrement(&mut self, item: &ItemId) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let remaining: Option<i64> = conn
            .query_row(
                "UPDATE stock_ledger SET remaining = remaining - 1
                 WHERE item_id = ?1 AND remaining > 0
                 RETURNING remaining",
                params![item.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match remaining {
            Some(remaining) => from_sql_count(remaining),
            None if select_remaining(conn, item)?.is_some() => {
                Err(StoreError::BelowFloor(item.clone()))
            }
            None => Err(StoreError::UnknownItem(item.clone())),
        }
    }

    fn insert_allocation(
        &mut self,
        item: &ItemId,
        issued_at: DateTime<Utc>,
    ) -> Result<AllocationId, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO allocations (item_id, issued_at) VALUES (?1, ?2)",
            params![item.as_str(), format_time(issued_at)],
        )?;
        Ok(AllocationId(from_sql_count(conn.last_insert_rowid())?))
    }

    fn insert_events(&mut self, events: &[Event]) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO events (subject_id, timestamp, metadata) VALUES (?1, ?2, ?3)",
        )?;
        for event in events {
            stmt.execute(params![
                event.subject_id,
                format_time(event.timestamp),
                serde_json::to_string(&event.auxiliary())?,
            ])?;
        }
        Ok(events.len())
    }

    fn commit(mut self) -> Result<(), StoreError> {
        self.finish("COMMIT")
    }

    fn rollback(mut self) -> Result<(), StoreError> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTxn<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if conn.execute_batch("ROLLBACK").is_ok() {
                self.store.release(conn);
            }
        }
    }
}

fn select_remaining(conn: &Connection, item: &ItemId) -> Result<Option<u64>, StoreError> {
    let remaining: Option<i64> = conn
        .query_row(
            "SELECT remaining FROM stock_ledger WHERE item_id = ?1",
            params![item.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    remaining.map(from_sql_count).transpose()
}

fn query_allocations(
    conn: &Connection,
    item: &ItemId,
) -> Result<Vec<(i64, String, String)>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, item_id, issued_at FROM allocations WHERE item_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map(params![item.as_str()], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_events(conn: &Connection) -> Result<Vec<(i64, i64, String, String)>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, subject_id, timestamp, metadata FROM events ORDER BY id ASC")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// SQLite integers are i64; counts and ids stored here are never negative.
fn from_sql_count(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative count {}", value)))
}

fn to_sql_count(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("count {} out of range", value)))
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {:?}: {}", raw, e)))
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
