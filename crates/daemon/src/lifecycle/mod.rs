// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Daemon lifecycle management: startup, shutdown, background tasks.

mod startup;

pub use startup::{startup, StartupResult};

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use crate::daemon::Daemon;
use crate::env;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix socket
    pub socket_path: PathBuf,
    /// Path to the pid/lock file
    pub lock_path: PathBuf,
    /// Directory of per-namespace config files
    pub config_dir: PathBuf,
    /// Directory of rollback snapshots
    pub snapshot_dir: PathBuf,
    /// Plugin binary search path
    pub plugin_dirs: Vec<PathBuf>,
    /// Root state directory
    pub state_dir: PathBuf,
    /// Daemon log file
    pub log_path: PathBuf,
}

impl Config {
    /// Load configuration from the environment with fixed system defaults.
    pub fn load() -> Self {
        let state_dir = env::state_dir();
        Self {
            socket_path: env::socket_path(),
            lock_path: state_dir.join("jackd.pid"),
            config_dir: env::config_dir(),
            snapshot_dir: env::snapshot_dir(),
            plugin_dirs: env::plugin_dirs(),
            log_path: state_dir.join("jackd.log"),
            state_dir,
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] jack_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shutdown the daemon gracefully: stop the observer, flush and close every
/// plugin, and remove the socket and pid files.
pub async fn shutdown(daemon: &Daemon, config: &Config) {
    info!("shutting down daemon...");
    daemon.observer.stop();

    for (namespace, plugin) in daemon.plugins.get_all() {
        let cancel = tokio_util::sync::CancellationToken::new();
        if let Err(e) = daemon.loader.unload(&plugin, &cancel).await {
            warn!(namespace = %namespace, error = %e, "flush during shutdown failed");
        }
    }
    daemon.plugins.close_all().await;

    for path in [&config.socket_path, &config.lock_path] {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "failed to remove file");
            }
        }
    }
    info!("daemon shutdown complete");
}
