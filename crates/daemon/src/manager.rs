// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Plugin fleet management: wave loading at startup, enable/disable,
//! rescan, and log event forwarding.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use jack_core::Config;
use jack_plugin::{check_dependencies, Plugin, PluginError, PluginHandle};
use jack_store::PluginState;

use crate::daemon::Daemon;
use crate::protocol::Response;

/// Load every enabled plugin in dependency-satisfying waves.
///
/// Each wave loads the plugins whose required services are already ready.
/// A wave that loads nothing while plugins remain means unmet dependencies;
/// those plugins are skipped and logged. Never fails daemon startup.
pub async fn load_enabled_plugins(daemon: &Arc<Daemon>) {
    let mut remaining: BTreeSet<String> = daemon
        .settings_snapshot()
        .plugins
        .iter()
        .filter(|(_, state)| state.enabled)
        .map(|(name, _)| name.clone())
        .collect();

    while !remaining.is_empty() {
        let mut deferred = BTreeSet::new();
        let mut loaded_this_wave = 0usize;

        for name in &remaining {
            // Spawn to read required services; plugins whose requirements
            // are unmet wait for a later wave.
            let handle = match daemon.loader.load(name, daemon.rpc_handler()).await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(plugin = %name, error = %e, "plugin failed to load; skipping");
                    continue;
                }
            };
            let required = handle.required_services();
            if !daemon.services.are_services_ready(&required) {
                handle.close().await;
                deferred.insert(name.clone());
                continue;
            }
            match finish_load(daemon, name, handle).await {
                Ok(()) => {
                    loaded_this_wave += 1;
                    info!(plugin = %name, "plugin loaded");
                }
                Err(e) => {
                    warn!(plugin = %name, error = %e, "plugin setup failed; skipping");
                }
            }
        }

        if deferred.is_empty() {
            break;
        }
        if loaded_this_wave == 0 {
            let names: Vec<&str> = deferred.iter().map(String::as_str).collect();
            warn!(
                plugins = %names.join(", "),
                "plugins have unmet service dependencies and were not loaded"
            );
            break;
        }
        remaining = deferred;
    }
}

/// Register a handshaken plugin, apply its config, and mark its services
/// ready. Used by wave loading and `plugin-enable`.
async fn finish_load(
    daemon: &Arc<Daemon>,
    name: &str,
    handle: Arc<PluginHandle>,
) -> Result<(), PluginError> {
    let metadata = handle.metadata();
    let namespace = metadata.namespace.clone();

    daemon.plugins.register(Arc::clone(&handle) as Arc<dyn Plugin>, name)?;
    if let Err(e) = daemon.services.register_plugin(&namespace, &metadata.provided_services) {
        daemon.plugins.unregister(&namespace);
        handle.close().await;
        return Err(e);
    }

    // Config precedence at load: committed in the store, the on-disk file
    // (by plugin name), the metadata default, else empty.
    let config = match daemon.store.get_committed(&namespace) {
        Ok(config) => config.to_value(),
        Err(_) => {
            let value = match daemon.config_dir.load(name) {
                Ok(Some(value)) => value,
                _ => metadata
                    .default_config
                    .clone()
                    .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            };
            daemon.store.load_committed(&namespace, Config::Generic(value.clone()));
            value
        }
    };

    let cancel = CancellationToken::new();
    handle.apply_config(&config, &cancel).await?;
    daemon.store.set_last_applied(&namespace, Config::Generic(config));
    for service in &metadata.provided_services {
        daemon.services.mark_service_ready(&service.name);
    }
    Ok(())
}

/// `plugin-enable <name>`
pub async fn handle_plugin_enable(daemon: &Arc<Daemon>, name: &str) -> Response {
    if daemon.plugins.get_namespace_for_plugin(name).is_some() {
        return Response::failed(format!("plugin '{name}' is already enabled"));
    }

    let handle = match daemon.loader.load(name, daemon.rpc_handler()).await {
        Ok(handle) => handle,
        Err(e) => return Response::failed(e.to_string()),
    };
    let metadata = handle.metadata();
    if let Err(e) =
        daemon.services.validate_service_dependencies(name, &metadata.required_services)
    {
        handle.close().await;
        return Response::failed(e.to_string());
    }
    if let Err(e) = finish_load(daemon, name, handle).await {
        return Response::failed(e.to_string());
    }

    daemon.settings.write().plugins.insert(
        name.to_string(),
        PluginState { enabled: true, version: metadata.version.clone() },
    );
    if let Err(e) = daemon.persist_settings() {
        warn!(error = %e, "failed to persist settings");
    }
    Response::ok_message(format!("Plugin '{name}' enabled"))
}

/// `plugin-disable <name>`
pub async fn handle_plugin_disable(
    daemon: &Arc<Daemon>,
    name: &str,
    cancel: &CancellationToken,
) -> Response {
    if let Err(e) = check_dependencies(name, &daemon.plugins) {
        return Response::failed(e.to_string());
    }

    if let Some(namespace) = daemon.plugins.get_namespace_for_plugin(name) {
        if let Some(plugin) = daemon.plugins.unregister(&namespace) {
            daemon.services.unregister_plugin(&namespace);
            if let Err(e) = daemon.loader.unload(&plugin, cancel).await {
                warn!(plugin = name, error = %e, "flush during disable failed");
            }
        }
    } else {
        debug!(plugin = name, "not loaded; persisting disabled state only");
    }

    let mut settings = daemon.settings.write();
    settings.plugins.entry(name.to_string()).or_default().enabled = false;
    drop(settings);
    if let Err(e) = daemon.persist_settings() {
        warn!(error = %e, "failed to persist settings");
    }
    Response::ok_message(format!("Plugin '{name}' disabled"))
}

/// `plugin-rescan`: register newly discovered plugins as disabled.
pub async fn handle_plugin_rescan(daemon: &Arc<Daemon>) -> Response {
    let discovered = daemon.loader.scan_plugins().await;
    let mut added = Vec::new();
    {
        let mut settings = daemon.settings.write();
        for (name, metadata) in &discovered {
            if !settings.plugins.contains_key(name) {
                settings.plugins.insert(
                    name.clone(),
                    PluginState { enabled: false, version: metadata.version.clone() },
                );
                added.push(name.clone());
            }
        }
    }
    added.sort();
    if !added.is_empty() {
        if let Err(e) = daemon.persist_settings() {
            warn!(error = %e, "failed to persist settings");
        }
    }
    Response::ok_message(format!("Found {} new plugin(s)", added.len()))
        .with_data(json!(added))
}

/// `plugin-cli <name> <command> [args...]`
pub async fn handle_plugin_cli(
    daemon: &Arc<Daemon>,
    name: &str,
    command: &str,
    args: &[String],
    cancel: &CancellationToken,
) -> Response {
    let Some(namespace) = daemon.plugins.get_namespace_for_plugin(name) else {
        return Response::failed(format!("plugin '{name}' not found"));
    };
    let Some(plugin) = daemon.plugins.get(&namespace) else {
        return Response::failed(format!("plugin '{name}' not found"));
    };
    match plugin.execute_cli_command(command, args, cancel).await {
        Ok(output) => Response::ok()
            .with_data(Value::String(String::from_utf8_lossy(&output).into_owned())),
        Err(e) => Response::failed(e.to_string()),
    }
}

/// Forward daemon log entries to every plugin's `OnLogEvent`.
///
/// The not-implemented error is benign. Forwarding failures log under a
/// target the forwarder skips, so they cannot feed back into themselves.
pub fn spawn_log_forwarder(daemon: &Arc<Daemon>) -> tokio::task::JoinHandle<()> {
    let daemon = Arc::clone(daemon);
    let mut entries = daemon.logs.subscribe();
    tokio::spawn(async move {
        while let Ok(entry) = entries.recv().await {
            if entry.target == "jack::logfwd" {
                continue;
            }
            let Ok(event) = serde_json::to_value(&entry) else { continue };
            for (namespace, plugin) in daemon.plugins.get_all() {
                if let Err(e) = plugin.on_log_event(&event).await {
                    if !e.is_log_events_not_implemented() {
                        tracing::debug!(
                            target: "jack::logfwd",
                            namespace = %namespace,
                            error = %e,
                            "log forward failed"
                        );
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
