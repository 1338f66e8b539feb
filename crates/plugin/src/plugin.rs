// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! The daemon-side plugin capability set.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::PluginError;
use crate::metadata::{PluginMetadata, ServiceDescriptor};

/// A loaded plugin as the daemon sees it.
///
/// Every suspending call takes the request's cancellation token; a cancelled
/// call must not be treated as applied. The production implementation is the
/// out-of-process [`crate::PluginHandle`]; tests use `FakePlugin`.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Metadata captured at handshake time.
    fn metadata(&self) -> PluginMetadata;

    async fn apply_config(
        &self,
        config: &Value,
        cancel: &CancellationToken,
    ) -> Result<(), PluginError>;

    async fn validate_config(
        &self,
        config: &Value,
        cancel: &CancellationToken,
    ) -> Result<(), PluginError>;

    /// Tear down whatever the plugin pushed to the system.
    async fn flush(&self, cancel: &CancellationToken) -> Result<(), PluginError>;

    /// Status as one JSON object; a `warnings` array is surfaced after apply.
    async fn status(&self, cancel: &CancellationToken) -> Result<Value, PluginError>;

    async fn execute_cli_command(
        &self,
        command: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, PluginError>;

    /// Forward one daemon log entry. `PluginError::Rpc` with the
    /// not-implemented message is benign.
    async fn on_log_event(&self, event: &Value) -> Result<(), PluginError>;

    /// Invoke a service method on this plugin (it is the provider).
    async fn call_service(
        &self,
        service: &str,
        method: &str,
        args: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, PluginError>;

    async fn ping(&self) -> Result<(), PluginError>;

    fn provided_services(&self) -> Vec<ServiceDescriptor> {
        self.metadata().provided_services
    }

    fn required_services(&self) -> Vec<String> {
        self.metadata().required_services
    }

    /// Release the plugin process. Idempotent.
    async fn close(&self);
}
