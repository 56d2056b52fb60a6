// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use sluice_core::ItemId;
use sluice_daemon::protocol::{self, ProtocolError};
use sluice_daemon::{
    Paths, Request, Response, StockLevel, STARTUP_ERROR_PREFIX, STARTUP_MARKER_PREFIX,
};
use sluice_engine::Reply;
use thiserror::Error;
use tokio::net::UnixStream;
use tracing::debug;

/// Read a millisecond override from the environment
fn env_duration(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

fn timeout_ipc() -> Duration {
    env_duration("SLUICE_TIMEOUT_IPC_MS", protocol::DEFAULT_TIMEOUT)
}

fn timeout_connect() -> Duration {
    env_duration("SLUICE_TIMEOUT_CONNECT_MS", Duration::from_secs(5))
}

fn timeout_exit() -> Duration {
    env_duration("SLUICE_TIMEOUT_EXIT_MS", Duration::from_secs(2))
}

fn poll_interval() -> Duration {
    env_duration("SLUICE_POLL_INTERVAL_MS", Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

/// Daemon status as reported over IPC
#[derive(Debug, Clone, Serialize)]
pub struct DaemonStatus {
    pub uptime_secs: u64,
    pub pending_events: usize,
    pub outage: bool,
    pub stock: Vec<StockLevel>,
}

impl std::fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Uptime: {}s", self.uptime_secs)?;
        writeln!(f, "Pending events: {}", self.pending_events)?;
        writeln!(
            f,
            "Outage: {}",
            if self.outage { "engaged" } else { "off" }
        )?;
        write!(f, "Stock:")?;
        if self.stock.is_empty() {
            write!(f, " none")?;
        }
        for level in &self.stock {
            let remaining = level
                .remaining
                .map_or_else(|| "-".to_string(), |r| r.to_string());
            write!(
                f,
                "\n  {:<12} remaining {:<8} allocated {}",
                level.item, remaining, level.allocations
            )?;
        }
        Ok(())
    }
}

/// Daemon client
pub struct DaemonClient {
    socket_path: std::path::PathBuf,
}

impl DaemonClient {
    /// Connect to daemon, auto-starting if not running
    pub async fn connect_or_start(paths: &Paths) -> Result<Self, ClientError> {
        match Self::connect(paths) {
            Ok(client) => Ok(client),
            Err(ClientError::DaemonNotRunning) => {
                debug!("daemon not running, starting it");
                let child = start_daemon_background()?;
                Self::connect_with_retry(paths, timeout_connect(), child).await
            }
            Err(e) => Err(wrap_with_startup_error(e, paths)),
        }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect(paths: &Paths) -> Result<Self, ClientError> {
        if !paths.socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }

        Ok(Self {
            socket_path: paths.socket_path.clone(),
        })
    }

    async fn connect_with_retry(
        paths: &Paths,
        timeout: Duration,
        mut child: Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // An early exit means startup failed; the reason is in the log
            if let Ok(Some(status)) = child.try_wait() {
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error(paths) {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    tokio::time::sleep(poll_interval()).await;
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect(paths) {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => {
                    tokio::time::sleep(poll_interval()).await;
                }
                Err(e) => return Err(wrap_with_startup_error(e, paths)),
            }
        }

        Err(wrap_with_startup_error(
            ClientError::DaemonStartTimeout,
            paths,
        ))
    }

    /// Send one request and read its response, each leg bounded by the IPC timeout
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let timeout = timeout_ipc();
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol::encode(&request)?;
        tokio::time::timeout(timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let body = tokio::time::timeout(timeout, protocol::read_message(&mut reader))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        Ok(protocol::decode(&body)?)
    }

    /// Take one unit of `item`
    pub async fn purchase(&self, item: ItemId) -> Result<Reply, ClientError> {
        match self.send(Request::Purchase { item }).await? {
            Response::Reply(reply) => Ok(reply),
            other => Err(unexpected(other)),
        }
    }

    /// Hand an event payload to the ingestion buffer
    pub async fn ingest(&self, payload: Value) -> Result<Reply, ClientError> {
        match self.send(Request::Ingest { payload }).await? {
            Response::Reply(reply) => Ok(reply),
            other => Err(unexpected(other)),
        }
    }

    /// Get daemon status
    pub async fn status(&self) -> Result<DaemonStatus, ClientError> {
        match self.send(Request::Status).await? {
            Response::Status {
                uptime_secs,
                pending_events,
                outage,
                stock,
            } => Ok(DaemonStatus {
                uptime_secs,
                pending_events,
                outage,
                stock,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Engage or restore the simulated store outage
    pub async fn set_outage(&self, enabled: bool) -> Result<(), ClientError> {
        match self.send(Request::Outage { enabled }).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .send(Request::Hello {
                version: protocol::PROTOCOL_VERSION.to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }
}

/// Error for a response that does not answer the request
fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Error { message } => ClientError::Rejected(message),
        _ => ClientError::UnexpectedResponse,
    }
}

/// Start `sluice daemon run` in the background, returning the child process
fn start_daemon_background() -> Result<Child, ClientError> {
    let exe = std::env::current_exe()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))?;

    Command::new(exe)
        .args(["daemon", "run"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Start the daemon unless one is already answering
///
/// Returns false when a daemon was already running.
pub async fn daemon_start(paths: &Paths) -> Result<bool, ClientError> {
    if DaemonClient::connect(paths).is_ok() && read_daemon_pid(paths).is_some_and(process_exists)
    {
        return Ok(false);
    }
    // A socket left by a dead daemon would satisfy the readiness check early
    if paths.socket_path.exists() {
        std::fs::remove_file(&paths.socket_path)?;
    }
    let child = start_daemon_background()?;
    DaemonClient::connect_with_retry(paths, timeout_connect(), child).await?;
    Ok(true)
}

/// Stop the daemon (graceful first, then forceful)
/// Returns true if daemon was stopped, false if it wasn't running
pub async fn daemon_stop(paths: &Paths) -> Result<bool, ClientError> {
    let client = match DaemonClient::connect(paths) {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => {
            cleanup_stale_pid(paths);
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let shutdown_result = client.shutdown().await;

    if let Some(pid) = read_daemon_pid(paths) {
        if shutdown_result.is_ok() {
            wait_for_exit(pid, timeout_exit()).await;
        }

        if process_exists(pid) {
            kill(9, pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    } else if let Err(e) = shutdown_result {
        return Err(e);
    }

    cleanup_stale_pid(paths);
    Ok(true)
}

async fn wait_for_exit(pid: u32, timeout: Duration) {
    let start = Instant::now();
    while start.elapsed() < timeout && process_exists(pid) {
        tokio::time::sleep(poll_interval()).await;
    }
}

/// Remove a pid file left behind by a daemon that no longer runs
fn cleanup_stale_pid(paths: &Paths) {
    match read_daemon_pid(paths) {
        Some(pid) if process_exists(pid) => {}
        _ => {
            if paths.lock_path.exists() {
                let _ = std::fs::remove_file(&paths.lock_path);
            }
        }
    }
}

/// PID recorded in the daemon's lock file
pub fn read_daemon_pid(paths: &Paths) -> Option<u32> {
    std::fs::read_to_string(&paths.lock_path)
        .ok()
        .and_then(|content| content.trim().parse::<u32>().ok())
}

/// Run `kill -<signal> <pid>`; signal 0 only probes for the process
fn kill(signal: u8, pid: u32) -> bool {
    Command::new("kill")
        .args([format!("-{}", signal), pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

fn process_exists(pid: u32) -> bool {
    kill(0, pid)
}

/// Failure reported by the most recent startup attempt in the daemon log
fn read_startup_error(paths: &Paths) -> Option<String> {
    let content = std::fs::read_to_string(&paths.log_path).ok()?;
    let attempt = &content[content.rfind(STARTUP_MARKER_PREFIX)?..];

    attempt.lines().rev().find_map(|line| {
        line.split_once(STARTUP_ERROR_PREFIX)
            .map(|(_, message)| message.trim().to_string())
    })
}

/// Wrap an error with startup log info if available
fn wrap_with_startup_error(err: ClientError, paths: &Paths) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }

    match read_startup_error(paths) {
        Some(startup_error) => ClientError::DaemonStartFailed(startup_error),
        None => err,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
