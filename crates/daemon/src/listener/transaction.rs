// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Transactional edit handlers: status, diff, commit, revert, show, get,
//! set, validate.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use jack_core::{
    diff_configs, format_diff, parse_config_type, validate_value, Config, ConfigPath,
    INTERFACES_NAMESPACE, JACK_NAMESPACE, ROUTES_NAMESPACE,
};
use jack_plugin::Plugin;
use jack_store::DaemonSettings;

use crate::daemon::Daemon;
use crate::protocol::Response;

pub(super) fn handle_status(daemon: &Daemon) -> Response {
    let pending = daemon.store.get_pending_types();
    let message =
        if pending.is_empty() { "No pending changes" } else { "Pending changes exist" };
    Response::ok_message(message).with_data(serde_json::json!({ "pending": pending }))
}

pub(super) fn handle_diff(daemon: &Daemon) -> Response {
    let mut entries = Vec::new();
    for namespace in daemon.store.get_pending_types() {
        let Some(pending) = daemon.store.get_pending(&namespace) else { continue };
        let committed = daemon
            .store
            .get_committed(&namespace)
            .unwrap_or_else(|_| Config::empty(&namespace));
        entries.extend(diff_configs(&namespace, &committed, &pending));
    }
    Response::ok_message(format!("{} change(s)", entries.len()))
        .with_data(Value::String(format_diff(&entries)))
}

/// Validate every pending namespace, then move pending to committed and
/// persist each namespace to disk. Nothing is mutated when validation
/// fails.
pub(super) async fn handle_commit(daemon: &Arc<Daemon>, cancel: &CancellationToken) -> Response {
    let pending_types = daemon.store.get_pending_types();
    if pending_types.is_empty() {
        return Response::ok_message("No pending changes");
    }

    let mut errors: Vec<String> = Vec::new();
    for namespace in &pending_types {
        let Some(config) = daemon.store.get_pending(namespace) else { continue };
        match &config {
            Config::Interfaces(map) => {
                for (key, interface) in map {
                    if let Err(e) = interface.validate() {
                        errors.push(format!("{namespace}.{key}: {e}"));
                    }
                }
            }
            Config::Routes(map) => {
                for (key, route) in map {
                    if let Err(e) = route.validate() {
                        errors.push(format!("{namespace}.{key}: {e}"));
                    }
                }
            }
            Config::Generic(value) => {
                if let Some(plugin) = daemon.plugins.get(namespace) {
                    if let Err(e) = plugin.validate_config(value, cancel).await {
                        errors.push(format!("{namespace}: {e}"));
                    }
                } else if namespace == JACK_NAMESPACE {
                    if let Err(e) = serde_json::from_value::<DaemonSettings>(value.clone()) {
                        errors.push(format!("{namespace}: {e}"));
                    }
                }
            }
        }
    }
    if !errors.is_empty() {
        return Response::failed(format!("validation failed: {}", errors.join("; ")));
    }

    let committed = match daemon.store.commit_pending() {
        Ok(committed) => committed,
        Err(e) => return Response::failed(e.to_string()),
    };

    for (namespace, config) in &committed {
        let stem = file_stem_for(daemon, namespace);
        if let Err(e) = daemon.config_dir.save(&stem, &config.to_value()) {
            return Response::failed(format!("commit persisted partially: {e}"));
        }
        if namespace == JACK_NAMESPACE {
            refresh_settings(daemon, config);
        }
    }

    info!(namespaces = committed.len(), "committed");
    Response::ok_message(format!("Committed {} namespace(s)", committed.len()))
}

/// Core namespaces persist under their own name; plugin namespaces persist
/// under the plugin name.
fn file_stem_for(daemon: &Daemon, namespace: &str) -> String {
    match namespace {
        INTERFACES_NAMESPACE | ROUTES_NAMESPACE | JACK_NAMESPACE => namespace.to_string(),
        _ => daemon
            .plugins
            .get_plugin_name_for_namespace(namespace)
            .unwrap_or_else(|| namespace.to_string()),
    }
}

fn refresh_settings(daemon: &Daemon, config: &Config) {
    match serde_json::from_value::<DaemonSettings>(config.to_value()) {
        Ok(settings) => {
            daemon.observer.update_settings(settings.observer);
            *daemon.settings.write() = settings;
        }
        Err(e) => warn!(error = %e, "committed jack settings did not parse"),
    }
}

pub(super) fn handle_revert(daemon: &Daemon) -> Response {
    daemon.store.revert_pending();
    Response::ok_message("Pending changes reverted")
}

pub(super) fn handle_show(daemon: &Daemon, path: Option<&str>) -> Response {
    match path {
        Some(path) => {
            let namespace = match parse_config_type(path) {
                Ok(namespace) => namespace,
                Err(e) => return Response::failed(e.to_string()),
            };
            match daemon.store.get_current(&namespace) {
                Ok(config) => Response::ok().with_data(config.to_value()),
                Err(e) => Response::failed(e.to_string()),
            }
        }
        None => Response::ok().with_data(full_current_config(daemon)),
    }
}

fn full_current_config(daemon: &Daemon) -> Value {
    let mut all = Map::new();
    for namespace in daemon.store.namespaces() {
        if let Ok(config) = daemon.store.get_current(&namespace) {
            all.insert(namespace, config.to_value());
        }
    }
    Value::Object(all)
}

pub(super) fn handle_get(daemon: &Daemon, path: Option<&str>) -> Response {
    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return Response::ok().with_data(full_current_config(daemon));
    };
    let parsed = match ConfigPath::parse(path) {
        Ok(parsed) => parsed,
        Err(e) => return Response::failed(e.to_string()),
    };
    let parsed = rewrite_path(daemon, parsed);
    let config = match daemon.store.get_current(parsed.namespace()) {
        Ok(config) => config,
        Err(e) => return Response::failed(e.to_string()),
    };
    match jack_core::get(&config, &parsed) {
        Ok(value) => Response::ok().with_data(value),
        Err(e) => Response::failed(e.to_string()),
    }
}

pub(super) fn handle_set(
    daemon: &Daemon,
    path: Option<&str>,
    value: Option<Value>,
) -> Response {
    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return Response::failed("missing path");
    };
    let Some(value) = value else {
        return Response::failed("missing value");
    };
    let parsed = match ConfigPath::parse(path) {
        Ok(parsed) => parsed,
        Err(e) => return Response::failed(e.to_string()),
    };
    let parsed = rewrite_path(daemon, parsed);
    let namespace = parsed.namespace().to_string();

    // Copy committed into pending on the first staged edit
    let mut config = match daemon.store.get_pending(&namespace) {
        Some(pending) => pending,
        None => match daemon.store.get_committed(&namespace) {
            Ok(committed) => committed,
            Err(_) if known_namespace(daemon, &namespace) => Config::empty(&namespace),
            Err(e) => return Response::failed(e.to_string()),
        },
    };
    if let Err(e) = jack_core::set(&mut config, &parsed, value) {
        return Response::failed(e.to_string());
    }
    daemon.store.set_pending(&namespace, config);
    Response::ok_message(format!("Set {parsed}"))
}

/// Namespaces that may be created by a first `set`: the core types plus any
/// loaded plugin's namespace.
fn known_namespace(daemon: &Daemon, namespace: &str) -> bool {
    matches!(namespace, INTERFACES_NAMESPACE | ROUTES_NAMESPACE | JACK_NAMESPACE)
        || daemon.plugins.is_registered(namespace)
}

pub(super) fn handle_validate(
    daemon: &Daemon,
    path: Option<&str>,
    value: Option<Value>,
) -> Response {
    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return Response::failed("missing path");
    };
    let Some(value) = value else {
        return Response::failed("missing value");
    };
    let parsed = match ConfigPath::parse(path) {
        Ok(parsed) => parsed,
        Err(e) => return Response::failed(e.to_string()),
    };
    let parsed = rewrite_path(daemon, parsed);
    let namespace = parsed.namespace().to_string();
    let current = daemon.store.get_current(&namespace).ok();
    match validate_value(&namespace, &parsed, value, current.as_ref()) {
        Ok(()) => Response::ok_message("Valid"),
        Err(e) => Response::failed(e.to_string()),
    }
}

/// Apply a plugin-declared path prefix: `ns.rest...` → `ns.prefix.rest...`.
fn rewrite_path(daemon: &Daemon, path: ConfigPath) -> ConfigPath {
    match daemon.plugins.get_path_prefix(path.namespace()) {
        Some(prefix) if !path.rest().is_empty() => path.with_prefix(&prefix),
        _ => path,
    }
}
