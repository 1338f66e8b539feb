// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Daemon startup: lock, load state, wave-load plugins, start background
//! tasks, bind the socket.

use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use fs2::FileExt;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use jack_adapters::{KernelMonitor, SystemAdapter};
use jack_core::{Clock, Config as ConfigValue, INTERFACES_NAMESPACE, JACK_NAMESPACE, ROUTES_NAMESPACE};
use jack_plugin::PluginLoader;
use jack_store::{ConfigDir, DaemonSettings, SnapshotStore};

use super::{Config, LifecycleError};
use crate::daemon::{Daemon, DaemonParts};
use crate::logs::LogBroadcaster;
use crate::{apply, env, manager};

/// Result of daemon startup.
pub struct StartupResult {
    pub daemon: Arc<Daemon>,
    /// The bound Unix socket, ready for the listener task.
    pub listener: UnixListener,
    // NOTE(lifetime): held to maintain the exclusive pid lock; released on drop
    #[allow(dead_code)]
    pub lock_file: File,
}

/// Bring the daemon up.
///
/// Plugin wave-loading failures are logged, never fatal; a failed socket
/// bind or pid lock is.
pub async fn startup(
    config: &Config,
    system: Arc<dyn SystemAdapter>,
    monitor: &dyn KernelMonitor,
    clock: Arc<dyn Clock>,
    logs: LogBroadcaster,
) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    let lock_file = acquire_lock(config)?;

    let config_dir = ConfigDir::new(config.config_dir.clone());
    let settings = DaemonSettings::load(&config_dir)?;
    let snapshots = SnapshotStore::new(config.snapshot_dir.clone());
    match snapshots.load_snapshots_from_disk() {
        Ok(count) if count > 0 => info!(count, "loaded snapshots from disk"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "snapshot index rebuild failed"),
    }

    let loader = PluginLoader::new(config.plugin_dirs.clone())
        .with_timeouts(env::rpc_timeout(), env::handshake_timeout());

    let (daemon, mut reconcile_rx) = Daemon::new(DaemonParts {
        snapshots,
        config_dir,
        loader,
        system,
        clock,
        settings,
        logs,
    });

    load_core_configs(&daemon);
    manager::load_enabled_plugins(&daemon).await;

    // Observer: netlink subscription feeding the drift loop, and the
    // reconcile task it enqueues work for
    match monitor.subscribe() {
        Ok(events) => {
            let observer_daemon = Arc::clone(&daemon);
            tokio::spawn(async move {
                let store = Arc::clone(&observer_daemon.store);
                observer_daemon.observer.run(events, store).await;
            });
        }
        Err(e) => error!(error = %e, "kernel monitor unavailable; drift detection disabled"),
    }
    let reconcile_daemon = Arc::clone(&daemon);
    tokio::spawn(async move {
        while reconcile_rx.recv().await.is_some() {
            info!("running drift reconciliation");
            let response =
                apply::handle_apply(&reconcile_daemon, &CancellationToken::new()).await;
            if !response.success {
                warn!(error = %response.error, "reconcile apply failed");
            }
        }
    });
    manager::spawn_log_forwarder(&daemon);

    let listener = bind_socket(config)?;
    Ok(StartupResult { daemon, listener, lock_file })
}

fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    let mut lock_file = File::create(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    let _ = writeln!(lock_file, "{}", std::process::id());
    Ok(lock_file)
}

/// Remove any stale socket, bind, and open permissions to local clients.
fn bind_socket(config: &Config) -> Result<UnixListener, LifecycleError> {
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(
            &config.socket_path,
            std::fs::Permissions::from_mode(0o666),
        ) {
            warn!(error = %e, "failed to set socket permissions");
        }
    }
    Ok(listener)
}

/// Load interfaces, routes, and the jack namespace into committed slots.
fn load_core_configs(daemon: &Arc<Daemon>) {
    for namespace in [INTERFACES_NAMESPACE, ROUTES_NAMESPACE] {
        match daemon.config_dir.load(namespace) {
            Ok(Some(value)) => match ConfigValue::from_value(namespace, value) {
                Ok(config) => {
                    daemon.store.load_committed(namespace, config);
                    info!(namespace, "loaded config from disk");
                }
                Err(e) => error!(namespace, error = %e, "config file is invalid"),
            },
            Ok(None) => {}
            Err(e) => error!(namespace, error = %e, "config file is unreadable"),
        }
    }
    let settings_value = daemon.settings_snapshot().to_config_value();
    daemon.store.load_committed(JACK_NAMESPACE, ConfigValue::Generic(settings_value));
}
