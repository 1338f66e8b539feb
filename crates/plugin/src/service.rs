// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Cross-plugin service discovery, readiness barriers, and call routing.
//!
//! A service has exactly one provider at any time. Readiness is a one-shot
//! barrier per provider: waiters registered before the provider exists share
//! a placeholder entry and unblock on the first `mark_service_ready`.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::PluginError;
use crate::metadata::ServiceDescriptor;
use crate::registry::PluginRegistry;

struct ServiceEntry {
    /// Provider namespace; `None` for a placeholder created by a waiter.
    provider: Option<String>,
    descriptor: Option<ServiceDescriptor>,
    ready: watch::Sender<bool>,
}

impl ServiceEntry {
    fn placeholder() -> Self {
        let (ready, _) = watch::channel(false);
        Self { provider: None, descriptor: None, ready }
    }
}

/// Listing entry for `list_services`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub provider: String,
    pub description: String,
    pub ready: bool,
}

/// Registry of service → provider bindings and readiness channels.
#[derive(Default)]
pub struct ServiceRegistry {
    inner: RwLock<HashMap<String, ServiceEntry>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    /// Claim every service in `services` for the plugin in `namespace`.
    /// All-or-nothing: any already-claimed name fails the whole call.
    pub fn register_plugin(
        &self,
        namespace: &str,
        services: &[ServiceDescriptor],
    ) -> Result<(), PluginError> {
        let mut inner = self.inner.write();
        for descriptor in services {
            if let Some(entry) = inner.get(&descriptor.name) {
                if let Some(provider) = &entry.provider {
                    return Err(PluginError::DuplicateService {
                        name: descriptor.name.clone(),
                        provider: provider.clone(),
                    });
                }
            }
        }
        for descriptor in services {
            // Adopt any waiter-created placeholder so existing subscribers
            // stay attached to the readiness channel.
            let entry =
                inner.entry(descriptor.name.clone()).or_insert_with(ServiceEntry::placeholder);
            entry.provider = Some(namespace.to_string());
            entry.descriptor = Some(descriptor.clone());
        }
        Ok(())
    }

    /// Drop every service the plugin in `namespace` provides. Dangling
    /// waiters are unblocked by the dropped readiness channel.
    pub fn unregister_plugin(&self, namespace: &str) {
        let mut inner = self.inner.write();
        inner.retain(|_, entry| entry.provider.as_deref() != Some(namespace));
    }

    /// Assert readiness. Idempotent; the first transition unblocks waiters.
    pub fn mark_service_ready(&self, name: &str) -> bool {
        let inner = self.inner.read();
        match inner.get(name) {
            Some(entry) => {
                entry.ready.send_replace(true);
                true
            }
            None => {
                debug!(service = name, "mark_service_ready on unknown service");
                false
            }
        }
    }

    pub fn is_service_ready(&self, name: &str) -> bool {
        self.inner.read().get(name).is_some_and(|entry| *entry.ready.borrow())
    }

    pub fn are_services_ready(&self, names: &[String]) -> bool {
        names.iter().all(|name| self.is_service_ready(name))
    }

    /// Block until the service is ready or the token is cancelled.
    ///
    /// Waiting on a service with no provider yet is allowed; the waiter
    /// unblocks when a provider registers and becomes ready. If the provider
    /// is unregistered instead, the wait fails with `NoProvider`.
    pub async fn wait_for_service(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), PluginError> {
        let mut receiver = {
            let mut inner = self.inner.write();
            inner.entry(name.to_string()).or_insert_with(ServiceEntry::placeholder).ready.subscribe()
        };
        loop {
            if *receiver.borrow() {
                return Ok(());
            }
            tokio::select! {
                _ = cancel.cancelled() => return Err(PluginError::Cancelled),
                changed = receiver.changed() => {
                    changed.map_err(|_| PluginError::NoProvider(name.to_string()))?;
                }
            }
        }
    }

    pub async fn wait_for_services(
        &self,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), PluginError> {
        for name in names {
            self.wait_for_service(name, cancel).await?;
        }
        Ok(())
    }

    /// Fail if any required service has no provider.
    pub fn validate_service_dependencies(
        &self,
        plugin: &str,
        required: &[String],
    ) -> Result<(), PluginError> {
        let inner = self.inner.read();
        let missing: Vec<&str> = required
            .iter()
            .filter(|name| {
                inner.get(name.as_str()).and_then(|entry| entry.provider.as_ref()).is_none()
            })
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PluginError::MissingServices {
                plugin: plugin.to_string(),
                services: missing.join(", "),
            })
        }
    }

    /// Route a service call to its provider plugin.
    pub async fn call_service(
        &self,
        registry: &PluginRegistry,
        name: &str,
        method: &str,
        args: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, PluginError> {
        let provider = {
            let inner = self.inner.read();
            inner
                .get(name)
                .and_then(|entry| entry.provider.clone())
                .ok_or_else(|| PluginError::NoProvider(name.to_string()))?
        };
        let plugin = registry
            .get(&provider)
            .ok_or_else(|| PluginError::NoProvider(name.to_string()))?;
        plugin.call_service(name, method, args, cancel).await
    }

    /// Every known service with a provider, sorted by name.
    pub fn list_services(&self) -> Vec<ServiceInfo> {
        let inner = self.inner.read();
        let mut services: Vec<ServiceInfo> = inner
            .iter()
            .filter_map(|(name, entry)| {
                let provider = entry.provider.clone()?;
                Some(ServiceInfo {
                    name: name.clone(),
                    provider,
                    description: entry
                        .descriptor
                        .as_ref()
                        .map(|d| d.description.clone())
                        .unwrap_or_default(),
                    ready: *entry.ready.borrow(),
                })
            })
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        services
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
