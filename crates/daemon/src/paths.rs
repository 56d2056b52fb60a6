// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem locations shared by the daemon and the CLI

use std::path::{Path, PathBuf};

/// Every file the daemon owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub state_dir: PathBuf,
    /// `sluice.toml`, optional
    pub config_path: PathBuf,
    /// Exclusive lock and PID file
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub socket_path: PathBuf,
}

impl Paths {
    /// Resolve from the environment; `None` when no home directory is known
    pub fn from_env() -> Option<Self> {
        Some(Self::new(&state_dir()?, &socket_dir()))
    }

    pub fn new(state_dir: &Path, socket_dir: &Path) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
            config_path: state_dir.join("sluice.toml"),
            lock_path: state_dir.join("sluiced.pid"),
            log_path: state_dir.join("sluiced.log"),
            socket_path: socket_dir.join("sluiced.sock"),
        }
    }
}

/// State directory: `SLUICE_STATE_DIR`, then `$XDG_STATE_HOME/sluice`,
/// then `~/.local/state/sluice`
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("SLUICE_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("sluice"));
    }
    dirs::home_dir().map(|home| home.join(".local/state/sluice"))
}

/// Socket directory
///
/// Uses /tmp/sluice by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with SLUICE_SOCKET_DIR.
pub fn socket_dir() -> PathBuf {
    std::env::var("SLUICE_SOCKET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp/sluice"))
}
