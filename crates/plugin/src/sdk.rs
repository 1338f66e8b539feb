// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Plugin-side runtime.
//!
//! A plugin executable implements [`PluginService`] and hands it to
//! [`serve_stdio`]; the runtime answers the daemon's capability calls over
//! stdio and exposes a [`DaemonClient`] for service calls back into the
//! daemon on the same transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::error::{PluginError, LOG_EVENTS_NOT_IMPLEMENTED};
use crate::metadata::PluginMetadata;
use crate::rpc::{RpcHandler, RpcPeer};

/// The capability set a plugin executable implements. Errors are plain
/// strings; the daemon surfaces them verbatim.
#[async_trait]
pub trait PluginService: Send + Sync + 'static {
    fn metadata(&self) -> PluginMetadata;

    async fn apply_config(&self, config: Value) -> Result<(), String>;

    async fn validate_config(&self, _config: Value) -> Result<(), String> {
        Ok(())
    }

    async fn flush(&self) -> Result<(), String> {
        Ok(())
    }

    async fn status(&self) -> Value {
        json!({})
    }

    async fn execute_cli_command(&self, command: &str, _args: &[String]) -> Result<String, String> {
        Err(format!("unknown command: {command}"))
    }

    async fn on_log_event(&self, _event: Value) -> Result<(), String> {
        Err(LOG_EVENTS_NOT_IMPLEMENTED.to_string())
    }

    /// Called when this plugin is the provider of `service`.
    async fn call_service(
        &self,
        service: &str,
        _method: &str,
        _args: Value,
    ) -> Result<Value, String> {
        Err(format!("service '{service}' not implemented"))
    }
}

/// Client half for plugin → daemon calls.
#[derive(Clone)]
pub struct DaemonClient {
    peer: Arc<RpcPeer>,
    timeout: Duration,
}

impl DaemonClient {
    /// Invoke another plugin's service through the daemon.
    pub async fn call_service(
        &self,
        service: &str,
        method: &str,
        args: Value,
    ) -> Result<Value, PluginError> {
        let params = json!({ "service": service, "method": method, "args": args });
        self.peer
            .call("CallService", params, self.timeout, &CancellationToken::new())
            .await
    }

    pub async fn ping(&self) -> Result<(), PluginError> {
        self.peer
            .call("Ping", Value::Null, self.timeout, &CancellationToken::new())
            .await?;
        Ok(())
    }
}

/// A running plugin-side transport.
pub struct PluginRuntime {
    peer: Arc<RpcPeer>,
}

impl PluginRuntime {
    /// Start serving `service` over the given streams.
    pub fn start<S, R, W>(service: S, reader: R, writer: W) -> Self
    where
        S: PluginService,
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let handler = Arc::new(ServiceHandler { service: Arc::new(service) });
        let peer = Arc::new(RpcPeer::spawn(reader, writer, handler));
        Self { peer }
    }

    pub fn daemon(&self) -> DaemonClient {
        DaemonClient { peer: Arc::clone(&self.peer), timeout: Duration::from_secs(30) }
    }

    /// Resolves when the daemon hangs up.
    pub async fn wait(&self) {
        self.peer.closed().await;
    }
}

/// Serve on stdio until the daemon closes the transport. This is the whole
/// main loop of a typical plugin binary.
pub async fn serve_stdio<S: PluginService>(service: S) {
    let runtime = PluginRuntime::start(service, tokio::io::stdin(), tokio::io::stdout());
    runtime.wait().await;
}

struct ServiceHandler<S> {
    service: Arc<S>,
}

#[async_trait]
impl<S: PluginService> RpcHandler for ServiceHandler<S> {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, String> {
        match method {
            "Metadata" => {
                serde_json::to_value(self.service.metadata()).map_err(|e| e.to_string())
            }
            "ApplyConfig" => {
                self.service.apply_config(params).await?;
                Ok(Value::Null)
            }
            "ValidateConfig" => {
                self.service.validate_config(params).await?;
                Ok(Value::Null)
            }
            "Flush" => {
                self.service.flush().await?;
                Ok(Value::Null)
            }
            "Status" => Ok(self.service.status().await),
            "ExecuteCLICommand" => {
                let command = params
                    .get("command")
                    .and_then(Value::as_str)
                    .ok_or("missing 'command'")?;
                let args: Vec<String> = params
                    .get("args")
                    .and_then(Value::as_array)
                    .map(|a| {
                        a.iter().filter_map(Value::as_str).map(str::to_string).collect()
                    })
                    .unwrap_or_default();
                let output = self.service.execute_cli_command(command, &args).await?;
                Ok(Value::String(output))
            }
            "OnLogEvent" => {
                self.service.on_log_event(params).await?;
                Ok(Value::Null)
            }
            "CallService" => {
                let service = params
                    .get("service")
                    .and_then(Value::as_str)
                    .ok_or("missing 'service'")?;
                let call =
                    params.get("method").and_then(Value::as_str).ok_or("missing 'method'")?;
                let args = params.get("args").cloned().unwrap_or(Value::Null);
                self.service.call_service(service, call, args).await
            }
            "Ping" => Ok(Value::Null),
            other => Err(format!("unknown method: {other}")),
        }
    }
}

#[cfg(test)]
#[path = "sdk_tests.rs"]
mod tests;
