// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Shared daemon context handed to every request handler and background task.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use jack_adapters::SystemAdapter;
use jack_core::Clock;
use jack_plugin::{PluginLoader, PluginRegistry, RpcHandler, ServiceRegistry};
use jack_store::{ConfigDir, DaemonSettings, SnapshotStore, StateStore, StoreError};

use crate::observer::Observer;
use crate::logs::LogBroadcaster;

/// Everything the handlers and background tasks share.
pub struct Daemon {
    pub store: Arc<StateStore>,
    pub snapshots: SnapshotStore,
    pub config_dir: ConfigDir,
    pub plugins: PluginRegistry,
    pub services: ServiceRegistry,
    pub loader: PluginLoader,
    pub system: Arc<dyn SystemAdapter>,
    pub clock: Arc<dyn Clock>,
    pub settings: RwLock<DaemonSettings>,
    pub observer: Observer,
    pub logs: LogBroadcaster,
    /// Serialises concurrent `apply` requests.
    pub apply_lock: tokio::sync::Mutex<()>,
}

/// Inputs for building a [`Daemon`].
pub struct DaemonParts {
    pub snapshots: SnapshotStore,
    pub config_dir: ConfigDir,
    pub loader: PluginLoader,
    pub system: Arc<dyn SystemAdapter>,
    pub clock: Arc<dyn Clock>,
    pub settings: DaemonSettings,
    pub logs: LogBroadcaster,
}

impl Daemon {
    /// Build the daemon context. Returns the receiving half of the
    /// reconcile channel for the caller to drive.
    pub fn new(parts: DaemonParts) -> (Arc<Self>, mpsc::Receiver<()>) {
        let (reconcile_tx, reconcile_rx) = mpsc::channel(1);
        let observer =
            Observer::new(Arc::clone(&parts.clock), parts.settings.observer, reconcile_tx);
        let daemon = Arc::new(Self {
            store: Arc::new(StateStore::new()),
            snapshots: parts.snapshots,
            config_dir: parts.config_dir,
            plugins: PluginRegistry::new(),
            services: ServiceRegistry::new(),
            loader: parts.loader,
            system: parts.system,
            clock: parts.clock,
            settings: RwLock::new(parts.settings),
            observer,
            logs: parts.logs,
            apply_lock: tokio::sync::Mutex::new(()),
        });
        (daemon, reconcile_rx)
    }

    /// Handler for requests plugins originate on their RPC transport.
    pub fn rpc_handler(self: &Arc<Self>) -> Arc<dyn RpcHandler> {
        Arc::new(DaemonService { daemon: Arc::downgrade(self) })
    }

    pub fn settings_snapshot(&self) -> DaemonSettings {
        self.settings.read().clone()
    }

    /// Persist the settings file and refresh the observer's copy.
    pub fn persist_settings(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().clone();
        self.observer.update_settings(settings.observer);
        settings.save(&self.config_dir)
    }
}

/// The daemon-side service exposed to plugins: routes `CallService` to the
/// provider plugin. Holds a weak back-reference so plugin transports never
/// keep a dying daemon alive.
struct DaemonService {
    daemon: Weak<Daemon>,
}

#[async_trait]
impl RpcHandler for DaemonService {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, String> {
        let Some(daemon) = self.daemon.upgrade() else {
            return Err("daemon is shutting down".to_string());
        };
        match method {
            "CallService" => {
                let service = params
                    .get("service")
                    .and_then(Value::as_str)
                    .ok_or("missing 'service'")?
                    .to_string();
                let call = params
                    .get("method")
                    .and_then(Value::as_str)
                    .ok_or("missing 'method'")?
                    .to_string();
                let args = params.get("args").cloned().unwrap_or(Value::Null);
                daemon
                    .services
                    .call_service(
                        &daemon.plugins,
                        &service,
                        &call,
                        &args,
                        &CancellationToken::new(),
                    )
                    .await
                    .map_err(|e| e.to_string())
            }
            "Ping" => Ok(Value::Null),
            other => Err(format!("unknown method: {other}")),
        }
    }
}
