// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Plugin discovery, spawn, teardown, and dependency ordering.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::PluginError;
use crate::metadata::PluginMetadata;
use crate::plugin::Plugin;
use crate::proxy::PluginHandle;
use crate::registry::PluginRegistry;
use crate::rpc::{NullHandler, RpcHandler};

/// Locates and spawns plugin executables.
pub struct PluginLoader {
    search_dirs: Vec<PathBuf>,
    rpc_timeout: Duration,
    handshake_timeout: Duration,
}

impl PluginLoader {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self {
            search_dirs,
            rpc_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeouts(mut self, rpc: Duration, handshake: Duration) -> Self {
        self.rpc_timeout = rpc;
        self.handshake_timeout = handshake;
        self
    }

    /// Locate a plugin binary by name across the search directories.
    pub fn find_plugin(&self, name: &str) -> Result<PathBuf, PluginError> {
        for dir in &self.search_dirs {
            let candidate = dir.join(name);
            if is_executable(&candidate) {
                return Ok(candidate);
            }
        }
        Err(PluginError::NotFound(name.to_string()))
    }

    /// Names of every executable in the search directories, sorted.
    pub fn discover(&self) -> Vec<String> {
        let mut names = Vec::new();
        for dir in &self.search_dirs {
            let Ok(entries) = std::fs::read_dir(dir) else { continue };
            for entry in entries.flatten() {
                let path = entry.path();
                if is_executable(&path) {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names.sort();
        names.dedup();
        names
    }

    /// Spawn a plugin and complete its handshake. `daemon` handles requests
    /// the plugin originates on the same transport.
    pub async fn load(
        &self,
        name: &str,
        daemon: Arc<dyn RpcHandler>,
    ) -> Result<Arc<PluginHandle>, PluginError> {
        let path = self.find_plugin(name)?;
        let handle =
            PluginHandle::spawn(name, &path, daemon, self.rpc_timeout, self.handshake_timeout)
                .await?;
        Ok(Arc::new(handle))
    }

    /// Transiently load every discovered plugin to read its metadata.
    pub async fn scan_plugins(&self) -> HashMap<String, PluginMetadata> {
        let mut found = HashMap::new();
        for name in self.discover() {
            match self.load(&name, Arc::new(NullHandler)).await {
                Ok(handle) => {
                    found.insert(name.clone(), handle.metadata());
                    handle.close().await;
                }
                Err(e) => warn!(plugin = %name, error = %e, "scan: failed to read metadata"),
            }
        }
        found
    }

    /// Flush then close. Flush errors propagate after the close completes.
    pub async fn unload(
        &self,
        plugin: &Arc<dyn Plugin>,
        cancel: &CancellationToken,
    ) -> Result<(), PluginError> {
        let flushed = plugin.flush(cancel).await;
        plugin.close().await;
        flushed
    }
}

fn is_executable(path: &std::path::Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else { return false };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    true
}

/// Refuse to disable a plugin any enabled plugin depends on.
///
/// The error enumerates the dependents so the operator knows what to
/// disable first.
pub fn check_dependencies(name: &str, registry: &PluginRegistry) -> Result<(), PluginError> {
    let mut dependents: Vec<String> = registry
        .get_all()
        .into_iter()
        .filter_map(|(namespace, plugin)| {
            let metadata = plugin.metadata();
            let plugin_name =
                registry.get_plugin_name_for_namespace(&namespace).unwrap_or(namespace);
            if plugin_name != name && metadata.dependencies.iter().any(|d| d == name) {
                Some(plugin_name)
            } else {
                None
            }
        })
        .collect();
    dependents.sort();
    if dependents.is_empty() {
        Ok(())
    } else {
        Err(PluginError::Dependents { name: name.to_string(), dependents: dependents.join(", ") })
    }
}

/// Topologically order plugin names by their `dependencies` lists,
/// dependencies first.
///
/// Cycles are tolerated: the DFS carries a temporary mark, logs the cycle,
/// and still emits every reachable plugin exactly once (the strict order is
/// only lost inside the cycle).
pub fn order_plugins_by_dependencies(
    metadata: &HashMap<String, PluginMetadata>,
) -> Vec<String> {
    fn visit(
        name: &str,
        metadata: &HashMap<String, PluginMetadata>,
        visiting: &mut HashSet<String>,
        done: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) {
        if done.contains(name) {
            return;
        }
        if !visiting.insert(name.to_string()) {
            debug!(plugin = name, "dependency cycle detected; best-effort order");
            return;
        }
        if let Some(meta) = metadata.get(name) {
            for dep in &meta.dependencies {
                if metadata.contains_key(dep) {
                    visit(dep, metadata, visiting, done, order);
                }
            }
        }
        visiting.remove(name);
        done.insert(name.to_string());
        order.push(name.to_string());
    }

    let mut names: Vec<&String> = metadata.keys().collect();
    names.sort();
    let mut visiting = HashSet::new();
    let mut done = HashSet::new();
    let mut order = Vec::with_capacity(metadata.len());
    for name in names {
        visit(name, metadata, &mut visiting, &mut done, &mut order);
    }
    order
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
