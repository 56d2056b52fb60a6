// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for daemon client behavior.

use super::*;
use std::fs;
use tempfile::{tempdir, TempDir};

fn test_paths() -> (TempDir, Paths) {
    let dir = tempdir().unwrap();
    let paths = Paths::new(dir.path(), dir.path());
    (dir, paths)
}

/// connect() must not touch the pid file while a daemon is mid-startup.
#[test]
fn connect_does_not_delete_pid_file() {
    let (_dir, paths) = test_paths();
    fs::write(&paths.lock_path, "12345\n").unwrap();

    let result = DaemonClient::connect(&paths);
    assert!(matches!(result, Err(ClientError::DaemonNotRunning)));
    assert!(paths.lock_path.exists(), "connect() must not delete pid file");
}

#[test]
fn read_daemon_pid_parses_trimmed_contents() {
    let (_dir, paths) = test_paths();
    assert_eq!(read_daemon_pid(&paths), None);

    fs::write(&paths.lock_path, "4242\n").unwrap();
    assert_eq!(read_daemon_pid(&paths), Some(4242));

    fs::write(&paths.lock_path, "").unwrap();
    assert_eq!(read_daemon_pid(&paths), None);
}

#[test]
fn stale_pid_file_is_removed() {
    let (_dir, paths) = test_paths();
    fs::write(&paths.lock_path, "999999999\n").unwrap();

    cleanup_stale_pid(&paths);
    assert!(!paths.lock_path.exists());
}

#[test]
fn live_pid_file_is_kept() {
    let (_dir, paths) = test_paths();
    fs::write(&paths.lock_path, format!("{}\n", std::process::id())).unwrap();

    cleanup_stale_pid(&paths);
    assert!(paths.lock_path.exists());
}

#[test]
fn startup_error_reads_only_the_last_attempt() {
    let (_dir, paths) = test_paths();
    let log = format!(
        "{prefix}1) ---\n\
         ERROR Failed to start daemon: old failure\n\
         {prefix}2) ---\n\
         2026-01-12T13:01:00Z  INFO sluice_daemon::run: Starting sluiced\n\
         ERROR Failed to start daemon: Failed to acquire lock: daemon already running\n",
        prefix = STARTUP_MARKER_PREFIX
    );
    fs::write(&paths.log_path, log).unwrap();

    assert_eq!(
        read_startup_error(&paths).as_deref(),
        Some("Failed to acquire lock: daemon already running")
    );
}

#[test]
fn startup_error_is_found_in_tracing_output() {
    let (_dir, paths) = test_paths();
    fs::write(
        &paths.log_path,
        format!(
            "{}9) ---\n2026-01-12T13:01:00Z ERROR sluice_daemon::run: {}Config error: invalid flush.batch_size\n",
            STARTUP_MARKER_PREFIX, STARTUP_ERROR_PREFIX
        ),
    )
    .unwrap();

    assert_eq!(
        read_startup_error(&paths).as_deref(),
        Some("Config error: invalid flush.batch_size")
    );
}

#[test]
fn daemon_errors_are_rejections() {
    assert!(matches!(
        unexpected(Response::Error {
            message: "bad".to_string()
        }),
        ClientError::Rejected(ref m) if m == "bad"
    ));
    assert!(matches!(
        unexpected(Response::Pong),
        ClientError::UnexpectedResponse
    ));
}

#[test]
fn clean_startup_has_no_error() {
    let (_dir, paths) = test_paths();
    fs::write(
        &paths.log_path,
        format!(
            "{}7) ---\n2026-01-12T13:01:00Z  INFO sluice_daemon::run: Daemon ready\n",
            STARTUP_MARKER_PREFIX
        ),
    )
    .unwrap();

    assert_eq!(read_startup_error(&paths), None);
}

#[test]
fn missing_log_has_no_error() {
    let (_dir, paths) = test_paths();
    assert_eq!(read_startup_error(&paths), None);
}

#[test]
fn startup_error_wraps_connection_errors() {
    let (_dir, paths) = test_paths();
    fs::write(
        &paths.log_path,
        format!(
            "{}7) ---\nERROR Failed to start daemon: invalid config\n",
            STARTUP_MARKER_PREFIX
        ),
    )
    .unwrap();

    let err = wrap_with_startup_error(ClientError::DaemonStartTimeout, &paths);
    assert!(matches!(err, ClientError::DaemonStartFailed(ref msg) if msg == "invalid config"));
}

#[test]
fn status_lists_every_item() {
    let status = DaemonStatus {
        uptime_secs: 12,
        pending_events: 3,
        outage: true,
        stock: vec![
            StockLevel {
                item: ItemId::from("A"),
                remaining: Some(97),
                allocations: 3,
            },
            StockLevel {
                item: ItemId::from("B"),
                remaining: None,
                allocations: 0,
            },
        ],
    };

    let text = status.to_string();
    assert!(text.contains("Uptime: 12s"));
    assert!(text.contains("Pending events: 3"));
    assert!(text.contains("Outage: engaged"));
    assert!(text.contains("remaining 97"));
    assert!(text.contains("allocated 3"));
    assert!(text.contains("remaining -"));
}

#[tokio::test]
async fn stop_without_daemon_reports_not_running() {
    let (_dir, paths) = test_paths();
    assert!(!daemon_stop(&paths).await.unwrap());
}
