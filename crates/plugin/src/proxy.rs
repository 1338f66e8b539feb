// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Out-of-process plugin proxy.
//!
//! Spawns the plugin executable, attaches its stdio as the RPC transport,
//! performs the `Metadata` handshake, and forwards every capability call.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::PluginError;
use crate::metadata::PluginMetadata;
use crate::plugin::Plugin;
use crate::rpc::{RpcHandler, RpcPeer};

/// A running plugin process and its RPC channel.
pub struct PluginHandle {
    name: String,
    metadata: PluginMetadata,
    peer: RpcPeer,
    child: Mutex<Option<Child>>,
    closed: AtomicBool,
    rpc_timeout: Duration,
}

impl PluginHandle {
    /// Spawn `executable` and perform the metadata handshake.
    ///
    /// `daemon` receives requests the plugin originates (service calls
    /// routed back through the daemon). The handshake is bounded by
    /// `handshake_timeout`; a plugin that never answers is killed.
    pub async fn spawn(
        name: &str,
        executable: &Path,
        daemon: Arc<dyn RpcHandler>,
        rpc_timeout: Duration,
        handshake_timeout: Duration,
    ) -> Result<Self, PluginError> {
        let mut child = Command::new(executable)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PluginError::Rpc("plugin stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PluginError::Rpc("plugin stdout unavailable".to_string()))?;
        let peer = RpcPeer::spawn(stdout, stdin, daemon);

        let handle = Self {
            name: name.to_string(),
            metadata: PluginMetadata::default(),
            peer,
            child: Mutex::new(Some(child)),
            closed: AtomicBool::new(false),
            rpc_timeout,
        };
        let metadata = match handle.fetch_metadata(handshake_timeout).await {
            Ok(metadata) => metadata,
            Err(e) => {
                handle.close().await;
                return Err(e);
            }
        };
        debug!(plugin = name, namespace = %metadata.namespace, "plugin handshake complete");
        Ok(Self { metadata, ..handle })
    }

    async fn fetch_metadata(&self, timeout: Duration) -> Result<PluginMetadata, PluginError> {
        let value =
            self.peer.call("Metadata", Value::Null, timeout, &CancellationToken::new()).await?;
        let metadata: PluginMetadata =
            serde_json::from_value(value).map_err(|e| PluginError::Metadata(e.to_string()))?;
        if metadata.namespace.is_empty() {
            return Err(PluginError::Metadata("namespace is empty".to_string()));
        }
        Ok(metadata)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Plugin for PluginHandle {
    fn metadata(&self) -> PluginMetadata {
        self.metadata.clone()
    }

    async fn apply_config(
        &self,
        config: &Value,
        cancel: &CancellationToken,
    ) -> Result<(), PluginError> {
        self.peer.call("ApplyConfig", config.clone(), self.rpc_timeout, cancel).await?;
        Ok(())
    }

    async fn validate_config(
        &self,
        config: &Value,
        cancel: &CancellationToken,
    ) -> Result<(), PluginError> {
        self.peer.call("ValidateConfig", config.clone(), self.rpc_timeout, cancel).await?;
        Ok(())
    }

    async fn flush(&self, cancel: &CancellationToken) -> Result<(), PluginError> {
        self.peer.call("Flush", Value::Null, self.rpc_timeout, cancel).await?;
        Ok(())
    }

    async fn status(&self, cancel: &CancellationToken) -> Result<Value, PluginError> {
        self.peer.call("Status", Value::Null, self.rpc_timeout, cancel).await
    }

    async fn execute_cli_command(
        &self,
        command: &str,
        args: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, PluginError> {
        let params = json!({ "command": command, "args": args });
        let result =
            self.peer.call("ExecuteCLICommand", params, self.rpc_timeout, cancel).await?;
        match result {
            Value::String(output) => Ok(output.into_bytes()),
            other => Ok(other.to_string().into_bytes()),
        }
    }

    async fn on_log_event(&self, event: &Value) -> Result<(), PluginError> {
        self.peer
            .call("OnLogEvent", event.clone(), self.rpc_timeout, &CancellationToken::new())
            .await?;
        Ok(())
    }

    async fn call_service(
        &self,
        service: &str,
        method: &str,
        args: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, PluginError> {
        let params = json!({ "service": service, "method": method, "args": args });
        self.peer.call("CallService", params, self.rpc_timeout, cancel).await
    }

    async fn ping(&self) -> Result<(), PluginError> {
        self.peer
            .call("Ping", Value::Null, self.rpc_timeout, &CancellationToken::new())
            .await?;
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.peer.close();
        let child = self.child.lock().take();
        if let Some(mut child) = child {
            if let Err(e) = child.start_kill() {
                warn!(plugin = %self.name, error = %e, "failed to kill plugin process");
            }
        }
    }
}
