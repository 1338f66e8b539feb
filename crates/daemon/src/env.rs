// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Daemon version (from Cargo.toml)
pub const DAEMON_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve socket path: JACK_SOCKET_PATH > /var/run/jack.sock
pub fn socket_path() -> PathBuf {
    match std::env::var("JACK_SOCKET_PATH") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from("/var/run/jack.sock"),
    }
}

/// Resolve config directory: JACK_CONFIG_DIR > /etc/jack
pub fn config_dir() -> PathBuf {
    match std::env::var("JACK_CONFIG_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from("/etc/jack"),
    }
}

/// Resolve state directory: JACK_STATE_DIR > /var/lib/jack
pub fn state_dir() -> PathBuf {
    match std::env::var("JACK_STATE_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from("/var/lib/jack"),
    }
}

/// Snapshot directory under the state dir.
pub fn snapshot_dir() -> PathBuf {
    state_dir().join("snapshots")
}

/// Plugin search path: JACK_PLUGIN_PATH (colon-separated) > system dirs
pub fn plugin_dirs() -> Vec<PathBuf> {
    match std::env::var("JACK_PLUGIN_PATH") {
        Ok(path) if !path.is_empty() => path.split(':').map(PathBuf::from).collect(),
        _ => vec![
            PathBuf::from("/usr/lib/jack/plugins"),
            PathBuf::from("/usr/local/lib/jack/plugins"),
        ],
    }
}

fn duration_var(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

/// Per-request socket read/write timeout.
pub fn ipc_timeout() -> Duration {
    duration_var("JACK_IPC_TIMEOUT_MS", Duration::from_secs(5))
}

/// Per-call plugin RPC deadline.
pub fn rpc_timeout() -> Duration {
    duration_var("JACK_RPC_TIMEOUT_MS", Duration::from_secs(30))
}

/// Plugin load handshake deadline.
pub fn handshake_timeout() -> Duration {
    duration_var("JACK_HANDSHAKE_TIMEOUT_MS", Duration::from_secs(10))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
