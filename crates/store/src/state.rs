// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Per-namespace config slots: committed, pending, last-applied.
//!
//! The store owns every slot; all mutation goes through it under one
//! read/write lock, which makes edits within a namespace linearisable.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use jack_core::{configs_equal, Config, Interface, Route, INTERFACES_NAMESPACE, ROUTES_NAMESPACE};

use crate::error::StoreError;

#[derive(Debug, Default, Clone)]
struct ConfigSlots {
    committed: Option<Config>,
    pending: Option<Config>,
    last_applied: Option<Config>,
}

/// Registry of config slots keyed by namespace.
#[derive(Debug, Default)]
pub struct StateStore {
    inner: RwLock<HashMap<String, ConfigSlots>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a committed config, creating the namespace entry if needed.
    pub fn load_committed(&self, namespace: &str, config: Config) {
        let mut inner = self.inner.write();
        inner.entry(namespace.to_string()).or_default().committed = Some(config);
    }

    /// The effective config: pending if staged, else committed.
    pub fn get_current(&self, namespace: &str) -> Result<Config, StoreError> {
        let inner = self.inner.read();
        inner
            .get(namespace)
            .and_then(|slots| slots.pending.clone().or_else(|| slots.committed.clone()))
            .ok_or_else(|| StoreError::UnknownConfigType(namespace.to_string()))
    }

    pub fn get_committed(&self, namespace: &str) -> Result<Config, StoreError> {
        let inner = self.inner.read();
        inner
            .get(namespace)
            .and_then(|slots| slots.committed.clone())
            .ok_or_else(|| StoreError::UnknownConfigType(namespace.to_string()))
    }

    /// Whether any namespace has a staged edit.
    pub fn has_pending(&self) -> bool {
        self.inner.read().values().any(|slots| slots.pending.is_some())
    }

    /// Whether `namespace` has a staged edit. Unknown namespaces report
    /// false rather than an error.
    pub fn has_pending_for(&self, namespace: &str) -> bool {
        self.inner.read().get(namespace).is_some_and(|slots| slots.pending.is_some())
    }

    /// Namespaces with staged edits, sorted.
    pub fn get_pending_types(&self) -> Vec<String> {
        let inner = self.inner.read();
        let mut namespaces: Vec<String> = inner
            .iter()
            .filter(|(_, slots)| slots.pending.is_some())
            .map(|(ns, _)| ns.clone())
            .collect();
        namespaces.sort();
        namespaces
    }

    pub fn set_pending(&self, namespace: &str, config: Config) {
        let mut inner = self.inner.write();
        inner.entry(namespace.to_string()).or_default().pending = Some(config);
    }

    pub fn get_pending(&self, namespace: &str) -> Option<Config> {
        self.inner.read().get(namespace).and_then(|slots| slots.pending.clone())
    }

    /// Move every pending slot to committed. Fails when nothing is staged.
    /// Returns the committed `(namespace, config)` pairs for persistence.
    pub fn commit_pending(&self) -> Result<Vec<(String, Config)>, StoreError> {
        let mut inner = self.inner.write();
        if !inner.values().any(|slots| slots.pending.is_some()) {
            return Err(StoreError::NoPending);
        }
        let mut committed = Vec::new();
        for (namespace, slots) in inner.iter_mut() {
            if let Some(pending) = slots.pending.take() {
                slots.committed = Some(pending.clone());
                committed.push((namespace.clone(), pending));
            }
        }
        committed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(committed)
    }

    /// Clear every pending slot. Idempotent.
    pub fn revert_pending(&self) {
        let mut inner = self.inner.write();
        for slots in inner.values_mut() {
            slots.pending = None;
        }
    }

    pub fn get_last_applied(&self, namespace: &str) -> Option<Config> {
        self.inner.read().get(namespace).and_then(|slots| slots.last_applied.clone())
    }

    /// Record a successful per-namespace apply.
    pub fn set_last_applied(&self, namespace: &str, config: Config) {
        let mut inner = self.inner.write();
        inner.entry(namespace.to_string()).or_default().last_applied = Some(config);
    }

    /// Whether the current config for `namespace` matches its last applied
    /// one (canonical JSON comparison). Never-applied namespaces report
    /// false.
    pub fn current_matches_last_applied(&self, namespace: &str) -> bool {
        let inner = self.inner.read();
        let Some(slots) = inner.get(namespace) else { return false };
        match (&slots.pending.clone().or_else(|| slots.committed.clone()), &slots.last_applied) {
            (Some(current), Some(applied)) => configs_equal(current, applied),
            _ => false,
        }
    }

    /// All known namespaces, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.inner.read().keys().cloned().collect();
        namespaces.sort();
        namespaces
    }

    /// Current interfaces map, or `None` when the namespace was never
    /// loaded.
    pub fn current_interfaces(&self) -> Option<BTreeMap<String, Interface>> {
        self.get_current(INTERFACES_NAMESPACE)
            .ok()
            .and_then(|config| config.as_interfaces().cloned())
    }

    /// Current routes map, or `None` when the namespace was never loaded.
    pub fn current_routes(&self) -> Option<BTreeMap<String, Route>> {
        self.get_current(ROUTES_NAMESPACE).ok().and_then(|config| config.as_routes().cloned())
    }

    /// Committed interfaces map, or `None` when nothing is committed.
    pub fn committed_interfaces(&self) -> Option<BTreeMap<String, Interface>> {
        self.get_committed(INTERFACES_NAMESPACE)
            .ok()
            .and_then(|config| config.as_interfaces().cloned())
    }

    /// Committed routes map, or `None` when nothing is committed.
    pub fn committed_routes(&self) -> Option<BTreeMap<String, Route>> {
        self.get_committed(ROUTES_NAMESPACE).ok().and_then(|config| config.as_routes().cloned())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
