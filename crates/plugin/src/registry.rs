// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Namespace ↔ plugin-name ↔ instance mappings.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::PluginError;
use crate::plugin::Plugin;

struct Entry {
    name: String,
    plugin: Arc<dyn Plugin>,
}

#[derive(Default)]
struct Inner {
    by_namespace: HashMap<String, Entry>,
    namespace_by_name: HashMap<String, String>,
    prefix_by_namespace: HashMap<String, String>,
}

/// Registry of loaded plugin instances.
#[derive(Default)]
pub struct PluginRegistry {
    inner: RwLock<Inner>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loaded plugin under its metadata namespace.
    pub fn register(&self, plugin: Arc<dyn Plugin>, name: &str) -> Result<(), PluginError> {
        let metadata = plugin.metadata();
        let namespace = metadata.namespace.clone();
        let mut inner = self.inner.write();
        if inner.by_namespace.contains_key(&namespace) {
            return Err(PluginError::DuplicateNamespace(namespace));
        }
        if let Some(prefix) = metadata.path_prefix.as_deref() {
            if !prefix.is_empty() {
                inner.prefix_by_namespace.insert(namespace.clone(), prefix.to_string());
            }
        }
        inner.namespace_by_name.insert(name.to_string(), namespace.clone());
        inner.by_namespace.insert(namespace, Entry { name: name.to_string(), plugin });
        Ok(())
    }

    /// Remove a plugin, returning it so the caller can close it.
    pub fn unregister(&self, namespace: &str) -> Option<Arc<dyn Plugin>> {
        let mut inner = self.inner.write();
        let entry = inner.by_namespace.remove(namespace)?;
        inner.namespace_by_name.remove(&entry.name);
        inner.prefix_by_namespace.remove(namespace);
        Some(entry.plugin)
    }

    pub fn get(&self, namespace: &str) -> Option<Arc<dyn Plugin>> {
        self.inner.read().by_namespace.get(namespace).map(|e| Arc::clone(&e.plugin))
    }

    pub fn is_registered(&self, namespace: &str) -> bool {
        self.inner.read().by_namespace.contains_key(namespace)
    }

    /// `(namespace, plugin name)` pairs, sorted by namespace.
    pub fn list(&self) -> Vec<(String, String)> {
        let inner = self.inner.read();
        let mut entries: Vec<(String, String)> =
            inner.by_namespace.iter().map(|(ns, e)| (ns.clone(), e.name.clone())).collect();
        entries.sort();
        entries
    }

    /// Plugin names in the given metadata category, sorted.
    pub fn list_by_category(&self, category: &str) -> Vec<String> {
        let inner = self.inner.read();
        let mut names: Vec<String> = inner
            .by_namespace
            .values()
            .filter(|e| e.plugin.metadata().category == category)
            .map(|e| e.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn get_path_prefix(&self, namespace: &str) -> Option<String> {
        self.inner.read().prefix_by_namespace.get(namespace).cloned()
    }

    pub fn get_namespace_for_plugin(&self, name: &str) -> Option<String> {
        self.inner.read().namespace_by_name.get(name).cloned()
    }

    pub fn get_plugin_name_for_namespace(&self, namespace: &str) -> Option<String> {
        self.inner.read().by_namespace.get(namespace).map(|e| e.name.clone())
    }

    /// Copy of every `(namespace, instance)` pair, sorted by namespace.
    pub fn get_all(&self) -> Vec<(String, Arc<dyn Plugin>)> {
        let inner = self.inner.read();
        let mut entries: Vec<(String, Arc<dyn Plugin>)> = inner
            .by_namespace
            .iter()
            .map(|(ns, e)| (ns.clone(), Arc::clone(&e.plugin)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Close every plugin and clear the registry. Close is idempotent, so
    /// racing callers are harmless.
    pub async fn close_all(&self) {
        let plugins: Vec<Arc<dyn Plugin>> = {
            let mut inner = self.inner.write();
            inner.namespace_by_name.clear();
            inner.prefix_by_namespace.clear();
            inner.by_namespace.drain().map(|(_, e)| e.plugin).collect()
        };
        for plugin in plugins {
            plugin.close().await;
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
