// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Config with a small stock and a fast flush loop
pub const FAST_CONFIG: &str = r#"
[flush]
period = "50ms"
failure_pause = "50ms"

[[stock]]
item = "A"
remaining = 3
"#;

/// An isolated state and socket directory with a daemon that is stopped on drop
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new(config: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(dir.path().join("sluice.toml"), config).expect("Failed to write config");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A `sluice` command bound to this environment
    pub fn sluice(&self) -> Command {
        let mut cmd = Command::cargo_bin("sluice").expect("sluice binary");
        cmd.env("SLUICE_STATE_DIR", self.path())
            .env("SLUICE_SOCKET_DIR", self.path())
            .env("SLUICE_TIMEOUT_CONNECT_MS", "10000")
            .env_remove("RUST_LOG")
            .timeout(Duration::from_secs(30));
        cmd
    }

    pub fn pid_path(&self) -> std::path::PathBuf {
        self.path().join("sluiced.pid")
    }

    /// Poll `sluice status` until its output contains `needle`
    pub fn wait_for_status(&self, needle: &str, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            let output = self.sluice().arg("status").output().expect("run status");
            if String::from_utf8_lossy(&output.stdout).contains(needle) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        false
    }
}

impl Drop for TestEnv {
    fn drop(&mut self) {
        let _ = self.sluice().args(["daemon", "stop"]).output();
    }
}
