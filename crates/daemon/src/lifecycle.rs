// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use sluice_core::{Config, ConfigError, ItemId, SystemClock};
use sluice_engine::{Admission, Allocator, FlushScheduler, IngestionBuffer};
use sluice_storage::{
    DurableStore, OutageStore, OutageSwitch, SqliteStore, StoreError, TracedStore,
};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::paths::Paths;

/// Store stack the daemon runs on
pub type DaemonStore = OutageStore<TracedStore<SqliteStore>>;

/// State shared with every connection task
pub struct DaemonContext {
    pub admission: Admission<DaemonStore, SystemClock>,
    pub outage: OutageSwitch,
    /// Items seeded from configuration, reported by status
    pub items: Vec<ItemId>,
    pub start_time: Instant,
    /// Cancelled when a client asks the daemon to stop
    pub shutdown: CancellationToken,
}

/// Daemon state during operation
pub struct DaemonState {
    pub paths: Paths,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Unix socket listener
    pub listener: UnixListener,
    pub context: Arc<DaemonContext>,
    flush_cancel: CancellationToken,
    flusher: JoinHandle<usize>,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    ///
    /// The flush task is cancelled between cycles and awaited, so a batch
    /// that is being written finishes first. Events still pending after
    /// that are dropped.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Stop accepting connections
        drop(self.listener);
        if self.paths.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 2. Stop the flush task
        self.flush_cancel.cancel();
        match self.flusher.await {
            Ok(0) => {}
            Ok(pending) => warn!(pending, "dropping events that were never persisted"),
            Err(e) => warn!(error = %e, "flush task did not stop cleanly"),
        }

        // 3. Remove PID file
        if self.paths.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 4. Lock file is released when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(std::path::PathBuf, std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(paths: &Paths) -> Result<DaemonState, LifecycleError> {
    match startup_inner(paths).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(paths, &e);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(paths: &Paths) -> Result<DaemonState, LifecycleError> {
    // 1. Create directories
    std::fs::create_dir_all(&paths.state_dir)?;
    if let Some(parent) = paths.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // 2. Acquire lock file FIRST - prevents races. Truncate only once the
    // lock is ours so a running daemon's PID survives a failed attempt.
    let mut lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&paths.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Load configuration (defaults when the file is absent)
    let config = Config::load(&paths.config_path)?;

    // 4. Open the store; the schema exists before anything touches it
    let db_path = config.database_path(&paths.state_dir);
    let sqlite = SqliteStore::open(&db_path, config.store.busy_timeout)?;
    let traced = TracedStore::new(sqlite);
    for seed in &config.stock {
        traced.seed_stock(&seed.item, seed.remaining)?;
    }
    let outage = OutageSwitch::new(config.simulate_outage);
    let store = Arc::new(OutageStore::new(traced, outage.clone()));

    info!(
        db = %db_path.display(),
        items = config.stock.len(),
        simulate_outage = config.simulate_outage,
        "store ready"
    );

    // 5. Build the engine
    let buffer = IngestionBuffer::new(config.flush.queue_warn_depth);
    let allocator = Allocator::new(Arc::clone(&store), config.allocator, SystemClock);
    let admission = Admission::new(allocator, buffer.clone());
    let scheduler = FlushScheduler::new(store, buffer, config.flush.clone(), SystemClock);

    // 6. Remove stale socket and bind (only after all validation passes)
    if paths.socket_path.exists() {
        std::fs::remove_file(&paths.socket_path)?;
    }
    let listener = UnixListener::bind(&paths.socket_path)
        .map_err(|e| LifecycleError::BindFailed(paths.socket_path.clone(), e))?;

    // 7. Exactly one flush task per process
    let shutdown = CancellationToken::new();
    let flush_cancel = shutdown.child_token();
    let token = flush_cancel.clone();
    let flusher = tokio::spawn(async move { scheduler.run(token).await });

    info!("Daemon started in {}", paths.state_dir.display());

    Ok(DaemonState {
        paths: paths.clone(),
        lock_file,
        listener,
        context: Arc::new(DaemonContext {
            admission,
            outage,
            items: config.stock.iter().map(|seed| seed.item.clone()).collect(),
            start_time: Instant::now(),
            shutdown,
        }),
        flush_cancel,
        flusher,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(paths: &Paths, error: &LifecycleError) {
    // Another daemon owns these files
    if matches!(error, LifecycleError::LockFailed(_)) {
        return;
    }

    if paths.socket_path.exists() {
        let _ = std::fs::remove_file(&paths.socket_path);
    }
    if paths.lock_path.exists() {
        let _ = std::fs::remove_file(&paths.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
