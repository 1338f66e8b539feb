// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! The apply pipeline: snapshot, staged kernel application, tiered rollback.
//!
//! Step order is ipforward → interfaces → plugins → routes, recording a tag
//! per completed step. On failure the plugins are rolled back to their last
//! applied configs and the kernel is restored from the snapshot, scoped to
//! the recorded tags.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use jack_core::{configs_equal, order_interfaces, Config, INTERFACES_NAMESPACE, ROUTES_NAMESPACE};
use jack_plugin::{order_plugins_by_dependencies, Plugin, PluginMetadata};
use jack_store::{Snapshot, SnapshotMeta, SNAPSHOT_RETENTION};

use crate::daemon::Daemon;
use crate::protocol::Response;

struct ApplyFailure {
    step: String,
    completed: Vec<String>,
    cause: String,
}

/// Run the full pipeline. Concurrent applies are serialised.
pub async fn handle_apply(daemon: &Arc<Daemon>, cancel: &CancellationToken) -> Response {
    let _guard = daemon.apply_lock.lock().await;

    // 1. Capture a snapshot to roll back to
    let kernel = match daemon.system.capture_state().await {
        Ok(kernel) => kernel,
        Err(e) => return Response::failed(format!("snapshot capture failed: {e}")),
    };
    let checkpoint_id = format!("auto-{}", daemon.clock.unix_secs());
    let snapshot = Snapshot {
        checkpoint_id: checkpoint_id.clone(),
        timestamp: chrono::Utc::now(),
        kernel_state: kernel.state,
        firewall_rules: kernel.firewall_rules,
    };
    if let Err(e) = daemon.snapshots.save_snapshot(&snapshot) {
        return Response::failed(format!("snapshot persist failed: {e}"));
    }

    // 2. Suppress observer echoes of our own writes
    daemon.observer.mark_change();

    // 3. Staged application
    match execute_apply(daemon, cancel).await {
        Ok(warnings) => {
            if let Err(e) = daemon.snapshots.prune_old_snapshots(SNAPSHOT_RETENTION) {
                warn!(error = %e, "snapshot prune failed");
            }
            info!(checkpoint = %checkpoint_id, "apply complete");
            let message = if warnings.is_empty() {
                "Configuration applied".to_string()
            } else {
                format!("Configuration applied with {} warning(s)", warnings.len())
            };
            Response::ok_message(message)
                .with_data(json!({ "checkpoint_id": checkpoint_id, "warnings": warnings }))
        }
        Err(failure) => {
            error!(step = %failure.step, cause = %failure.cause, "apply failed; rolling back");
            rollback_plugins(daemon, cancel).await;

            // Plugin and route failures restore everything; earlier failures
            // restore only the scopes actually touched. The `interfaces` tag
            // is recorded before the loop, so partial interface progress is
            // restored too.
            let scopes = if failure.step.starts_with("plugin") || failure.step == "routes" {
                vec!["all".to_string()]
            } else {
                failure.completed.clone()
            };
            daemon.observer.mark_change();
            if let Err(e) = daemon.system.restore_state(&snapshot.kernel_state, &scopes).await {
                error!(error = %e, "kernel restore failed during rollback");
            }
            Response::failed(format!(
                "apply failed, rolled back to checkpoint {checkpoint_id}: {} (step {})",
                failure.cause, failure.step
            ))
        }
    }
}

async fn execute_apply(
    daemon: &Arc<Daemon>,
    cancel: &CancellationToken,
) -> Result<Vec<String>, ApplyFailure> {
    let mut completed: Vec<String> = Vec::new();

    // ipforward
    daemon.system.enable_ip_forwarding().await.map_err(|e| ApplyFailure {
        step: "ipforward".to_string(),
        completed: completed.clone(),
        cause: e.to_string(),
    })?;
    completed.push("ipforward".to_string());

    // interfaces; the tag goes in before the loop so rollback covers
    // partially applied sets
    if let Some(interfaces) = daemon.store.committed_interfaces() {
        completed.push("interfaces".to_string());
        for name in order_interfaces(&interfaces) {
            let Some(interface) = interfaces.get(&name) else { continue };
            daemon.system.apply_interface(&name, interface).await.map_err(|e| {
                ApplyFailure {
                    step: "interfaces".to_string(),
                    completed: completed.clone(),
                    cause: format!("interface {name}: {e}"),
                }
            })?;
        }
        daemon
            .store
            .set_last_applied(INTERFACES_NAMESPACE, Config::Interfaces(interfaces));
    }

    // plugins, in dependency order
    apply_plugins(daemon, cancel, &completed).await?;
    completed.push("plugins".to_string());

    // routes
    if let Some(routes) = daemon.store.committed_routes() {
        for route in routes.values().filter(|r| r.enabled) {
            daemon.system.apply_route(route).await.map_err(|e| ApplyFailure {
                step: "routes".to_string(),
                completed: completed.clone(),
                cause: format!("route {}: {e}", route.name),
            })?;
        }
        completed.push("routes".to_string());
        daemon.store.set_last_applied(ROUTES_NAMESPACE, Config::Routes(routes));
    }

    Ok(collect_warnings(daemon, cancel).await)
}

async fn apply_plugins(
    daemon: &Arc<Daemon>,
    cancel: &CancellationToken,
    completed: &[String],
) -> Result<(), ApplyFailure> {
    for (namespace, plugin) in plugins_in_dependency_order(daemon) {
        let name = daemon
            .plugins
            .get_plugin_name_for_namespace(&namespace)
            .unwrap_or_else(|| namespace.clone());
        let Some(config) = choose_plugin_config(daemon, &namespace, &name, &plugin.metadata())
        else {
            continue;
        };

        // Skip unchanged configs (canonical JSON comparison)
        let candidate = Config::Generic(config.clone());
        if daemon
            .store
            .get_last_applied(&namespace)
            .is_some_and(|applied| configs_equal(&applied, &candidate))
        {
            continue;
        }

        plugin.apply_config(&config, cancel).await.map_err(|e| ApplyFailure {
            step: format!("plugin {name}"),
            completed: completed.to_vec(),
            cause: e.to_string(),
        })?;
        daemon.store.set_last_applied(&namespace, candidate);
        for service in plugin.provided_services() {
            daemon.services.mark_service_ready(&service.name);
        }
    }
    Ok(())
}

/// Registered plugins as `(namespace, instance)` in dependency order.
fn plugins_in_dependency_order(daemon: &Daemon) -> Vec<(String, Arc<dyn Plugin>)> {
    let all = daemon.plugins.get_all();
    let mut by_name: HashMap<String, PluginMetadata> = HashMap::new();
    for (namespace, plugin) in &all {
        let name = daemon
            .plugins
            .get_plugin_name_for_namespace(namespace)
            .unwrap_or_else(|| namespace.clone());
        by_name.insert(name, plugin.metadata());
    }
    order_plugins_by_dependencies(&by_name)
        .into_iter()
        .filter_map(|name| {
            let namespace = daemon.plugins.get_namespace_for_plugin(&name)?;
            let plugin = daemon.plugins.get(&namespace)?;
            Some((namespace, plugin))
        })
        .collect()
}

/// Config precedence for a plugin apply: committed in the store, then the
/// on-disk file (by plugin name), then the metadata default, else skip.
fn choose_plugin_config(
    daemon: &Daemon,
    namespace: &str,
    name: &str,
    metadata: &PluginMetadata,
) -> Option<Value> {
    if let Ok(config) = daemon.store.get_committed(namespace) {
        return Some(config.to_value());
    }
    match daemon.config_dir.load(name) {
        Ok(Some(value)) => return Some(value),
        Ok(None) => {}
        Err(e) => warn!(plugin = name, error = %e, "config file unreadable; falling back"),
    }
    metadata.default_config.clone()
}

async fn collect_warnings(daemon: &Arc<Daemon>, cancel: &CancellationToken) -> Vec<String> {
    let mut warnings = Vec::new();
    for (namespace, plugin) in daemon.plugins.get_all() {
        let status = match plugin.status(cancel).await {
            Ok(status) => status,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "status unavailable after apply");
                continue;
            }
        };
        for warning in status
            .get("warnings")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
        {
            warnings.push(format!("{namespace}: {warning}"));
        }
    }
    warnings
}

/// Re-apply each plugin's last known-good config after a failed apply.
/// Errors are logged and never mask the original failure.
async fn rollback_plugins(daemon: &Arc<Daemon>, cancel: &CancellationToken) {
    for (namespace, plugin) in daemon.plugins.get_all() {
        if let Err(e) = plugin.flush(cancel).await {
            warn!(namespace = %namespace, error = %e, "rollback: flush failed");
        }
        let name = daemon
            .plugins
            .get_plugin_name_for_namespace(&namespace)
            .unwrap_or_else(|| namespace.clone());
        let config = match daemon.store.get_last_applied(&namespace) {
            Some(config) => Some(config.to_value()),
            None => daemon.config_dir.load(&name).ok().flatten(),
        };
        let Some(config) = config else { continue };
        if let Err(e) = plugin.apply_config(&config, cancel).await {
            warn!(namespace = %namespace, error = %e, "rollback: re-apply failed");
        }
    }
}

/// `rollback [id]`: restore plugins, kernel state, and firewall ruleset
/// from a stored checkpoint.
pub async fn handle_rollback(
    daemon: &Arc<Daemon>,
    checkpoint_id: Option<&str>,
    cancel: &CancellationToken,
) -> Response {
    let id = checkpoint_id.unwrap_or("latest");
    let snapshot = match daemon.snapshots.load_snapshot(id) {
        Ok(snapshot) => snapshot,
        Err(e) => return Response::failed(e.to_string()),
    };

    rollback_plugins(daemon, cancel).await;
    daemon.observer.mark_change();
    if let Err(e) = daemon
        .system
        .restore_state(&snapshot.kernel_state, &["all".to_string()])
        .await
    {
        return Response::failed(format!(
            "rollback to checkpoint {} failed: {e}",
            snapshot.checkpoint_id
        ));
    }
    if !snapshot.firewall_rules.is_empty() {
        if let Err(e) = daemon.system.restore_firewall(&snapshot.firewall_rules).await {
            warn!(error = %e, "firewall restore failed");
        }
    }
    Response::ok_message(format!("Rolled back to checkpoint {}", snapshot.checkpoint_id))
}

/// `checkpoint-create`: capture current state under a manual id.
pub async fn handle_checkpoint_create(daemon: &Arc<Daemon>) -> Response {
    let kernel = match daemon.system.capture_state().await {
        Ok(kernel) => kernel,
        Err(e) => return Response::failed(format!("snapshot capture failed: {e}")),
    };
    let checkpoint_id = format!("manual-{}", daemon.clock.unix_secs());
    let snapshot = Snapshot {
        checkpoint_id: checkpoint_id.clone(),
        timestamp: chrono::Utc::now(),
        kernel_state: kernel.state,
        firewall_rules: kernel.firewall_rules,
    };
    if let Err(e) = daemon.snapshots.save_snapshot(&snapshot) {
        return Response::failed(format!("snapshot persist failed: {e}"));
    }
    Response::ok_message(format!("Created checkpoint {checkpoint_id}"))
        .with_data(json!({ "checkpoint_id": checkpoint_id }))
}

/// `checkpoint-list`: snapshot metadata, oldest first.
pub fn handle_checkpoint_list(daemon: &Daemon) -> Response {
    let metas: Vec<SnapshotMeta> = daemon.snapshots.list_snapshots();
    let count = metas.len();
    Response::ok_message(format!("{count} checkpoint(s)"))
        .with_data(serde_json::to_value(metas).unwrap_or(Value::Null))
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod tests;
