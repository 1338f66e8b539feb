// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Aggregated daemon + plugin status for `info`.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use jack_plugin::Plugin;

use crate::daemon::Daemon;
use crate::env::DAEMON_VERSION;
use crate::protocol::Response;

pub(super) async fn handle_info(daemon: &Arc<Daemon>, cancel: &CancellationToken) -> Response {
    let mut plugins = Map::new();
    for (namespace, plugin) in daemon.plugins.get_all() {
        let name = daemon
            .plugins
            .get_plugin_name_for_namespace(&namespace)
            .unwrap_or_else(|| namespace.clone());
        let status = match plugin.status(cancel).await {
            Ok(status) => status,
            Err(e) => json!({ "error": e.to_string() }),
        };
        plugins.insert(
            name,
            json!({
                "namespace": namespace,
                "version": plugin.metadata().version,
                "status": status,
            }),
        );
    }

    let services: Vec<Value> = daemon
        .services
        .list_services()
        .into_iter()
        .map(|s| json!({ "name": s.name, "provider": s.provider, "ready": s.ready }))
        .collect();

    Response::ok_message(format!("jack {DAEMON_VERSION}")).with_data(json!({
        "version": DAEMON_VERSION,
        "pending": daemon.store.has_pending(),
        "plugins": plugins,
        "services": services,
    }))
}
