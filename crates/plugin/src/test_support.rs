// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! In-process fake plugin for tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::PluginError;
use crate::metadata::{PluginMetadata, ServiceDescriptor};
use crate::plugin::Plugin;

/// A scriptable in-process plugin.
pub struct FakePlugin {
    metadata: PluginMetadata,
    pub applied: Mutex<Vec<Value>>,
    pub flush_count: Mutex<u32>,
    pub log_events: Mutex<Vec<Value>>,
    pub service_calls: Mutex<Vec<(String, String, Value)>>,
    fail_apply: AtomicBool,
    validate_error: Mutex<Option<String>>,
    status: Mutex<Value>,
    closed: AtomicBool,
}

impl FakePlugin {
    pub fn new(namespace: &str) -> Self {
        let metadata = PluginMetadata {
            namespace: namespace.to_string(),
            version: "0.0-test".to_string(),
            ..PluginMetadata::default()
        };
        Self::with_metadata(metadata)
    }

    pub fn with_metadata(metadata: PluginMetadata) -> Self {
        Self {
            metadata,
            applied: Mutex::new(Vec::new()),
            flush_count: Mutex::new(0),
            log_events: Mutex::new(Vec::new()),
            service_calls: Mutex::new(Vec::new()),
            fail_apply: AtomicBool::new(false),
            validate_error: Mutex::new(None),
            status: Mutex::new(json!({})),
            closed: AtomicBool::new(false),
        }
    }

    /// Builder: declare provided services.
    pub fn providing(mut self, services: &[&str]) -> Self {
        self.metadata.provided_services = services
            .iter()
            .map(|name| ServiceDescriptor { name: name.to_string(), ..Default::default() })
            .collect();
        self
    }

    /// Builder: declare required services.
    pub fn requiring(mut self, services: &[&str]) -> Self {
        self.metadata.required_services = services.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Builder: declare plugin dependencies.
    pub fn depending_on(mut self, plugins: &[&str]) -> Self {
        self.metadata.dependencies = plugins.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn set_fail_apply(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::SeqCst);
    }

    pub fn set_validate_error(&self, error: Option<&str>) {
        *self.validate_error.lock() = error.map(str::to_string);
    }

    pub fn set_status(&self, status: Value) {
        *self.status.lock() = status;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn last_applied(&self) -> Option<Value> {
        self.applied.lock().last().cloned()
    }
}

#[async_trait]
impl Plugin for FakePlugin {
    fn metadata(&self) -> PluginMetadata {
        self.metadata.clone()
    }

    async fn apply_config(
        &self,
        config: &Value,
        _cancel: &CancellationToken,
    ) -> Result<(), PluginError> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(PluginError::Rpc("apply failed".to_string()));
        }
        self.applied.lock().push(config.clone());
        Ok(())
    }

    async fn validate_config(
        &self,
        _config: &Value,
        _cancel: &CancellationToken,
    ) -> Result<(), PluginError> {
        match self.validate_error.lock().clone() {
            Some(message) => Err(PluginError::Rpc(message)),
            None => Ok(()),
        }
    }

    async fn flush(&self, _cancel: &CancellationToken) -> Result<(), PluginError> {
        *self.flush_count.lock() += 1;
        Ok(())
    }

    async fn status(&self, _cancel: &CancellationToken) -> Result<Value, PluginError> {
        Ok(self.status.lock().clone())
    }

    async fn execute_cli_command(
        &self,
        command: &str,
        args: &[String],
        _cancel: &CancellationToken,
    ) -> Result<Vec<u8>, PluginError> {
        Ok(format!("{command} {}", args.join(" ")).into_bytes())
    }

    async fn on_log_event(&self, event: &Value) -> Result<(), PluginError> {
        self.log_events.lock().push(event.clone());
        Ok(())
    }

    async fn call_service(
        &self,
        service: &str,
        method: &str,
        args: &Value,
        _cancel: &CancellationToken,
    ) -> Result<Value, PluginError> {
        self.service_calls.lock().push((service.to_string(), method.to_string(), args.clone()));
        Ok(json!({ "service": service, "method": method }))
    }

    async fn ping(&self) -> Result<(), PluginError> {
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
