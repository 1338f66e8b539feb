// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::frame::Frame;
use crate::error::PluginError;

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, PluginError>>>>>;

/// Receives requests originated by the remote side of the transport.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn handle(&self, method: &str, params: Value) -> Result<Value, String>;
}

/// Handler that rejects every incoming request. Used for transient
/// connections (metadata scans) that never expect callbacks.
pub struct NullHandler;

#[async_trait]
impl RpcHandler for NullHandler {
    async fn handle(&self, method: &str, _params: Value) -> Result<Value, String> {
        Err(format!("unknown method: {method}"))
    }
}

/// One end of a bidirectional RPC transport.
///
/// Outgoing calls are correlated by id; incoming requests are dispatched to
/// the handler on their own tasks so slow handlers never stall responses.
pub struct RpcPeer {
    next_id: AtomicU64,
    pending: Pending,
    outgoing: mpsc::UnboundedSender<Frame>,
    shutdown: CancellationToken,
}

impl RpcPeer {
    /// Spawn reader and writer tasks over the given byte streams.
    ///
    /// Generic over the stream types so production uses child stdio and
    /// tests use in-memory duplex pipes.
    pub fn spawn<R, W>(reader: R, writer: W, handler: Arc<dyn RpcHandler>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        tokio::spawn(write_loop(writer, outgoing_rx, shutdown.clone()));
        tokio::spawn(read_loop(
            reader,
            handler,
            Arc::clone(&pending),
            outgoing_tx.clone(),
            shutdown.clone(),
        ));

        Self { next_id: AtomicU64::new(1), pending, outgoing: outgoing_tx, shutdown }
    }

    /// Issue a request and wait for its response.
    ///
    /// A timed-out or cancelled call abandons its correlation slot; a late
    /// response is dropped. Cancelled calls must never be treated as
    /// applied by the caller.
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Value, PluginError> {
        if self.shutdown.is_cancelled() {
            return Err(PluginError::ConnectionClosed);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        if self.outgoing.send(Frame::request(id, method, params)).is_err() {
            self.pending.lock().remove(&id);
            return Err(PluginError::ConnectionClosed);
        }

        tokio::select! {
            response = rx => match response {
                Ok(result) => result,
                Err(_) => Err(PluginError::ConnectionClosed),
            },
            _ = tokio::time::sleep(timeout) => {
                self.pending.lock().remove(&id);
                Err(PluginError::Timeout(timeout))
            }
            _ = cancel.cancelled() => {
                self.pending.lock().remove(&id);
                Err(PluginError::Cancelled)
            }
            _ = self.shutdown.cancelled() => {
                self.pending.lock().remove(&id);
                Err(PluginError::ConnectionClosed)
            }
        }
    }

    /// Tear the transport down. Idempotent; outstanding calls fail with
    /// `ConnectionClosed`.
    pub fn close(&self) {
        self.shutdown.cancel();
        fail_pending(&self.pending);
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves when the transport is torn down (peer hangup or `close`).
    pub async fn closed(&self) {
        self.shutdown.cancelled().await;
    }
}

async fn write_loop<W>(
    mut writer: W,
    mut outgoing: mpsc::UnboundedReceiver<Frame>,
    shutdown: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            frame = outgoing.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = shutdown.cancelled() => break,
        };
        let mut line = match serde_json::to_vec(&frame) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "dropping unserializable rpc frame");
                continue;
            }
        };
        line.push(b'\n');
        if writer.write_all(&line).await.is_err() || writer.flush().await.is_err() {
            break;
        }
    }
    shutdown.cancel();
}

async fn read_loop<R>(
    reader: R,
    handler: Arc<dyn RpcHandler>,
    pending: Pending,
    outgoing: mpsc::UnboundedSender<Frame>,
    shutdown: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => break,
            },
        };
        if line.trim().is_empty() {
            continue;
        }
        let frame: Frame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "ignoring malformed rpc frame");
                continue;
            }
        };

        if let Some(method) = frame.method {
            // Incoming request: handle on its own task so a slow handler
            // never blocks response correlation.
            let handler = Arc::clone(&handler);
            let outgoing = outgoing.clone();
            let id = frame.id;
            let params = frame.params.unwrap_or(Value::Null);
            tokio::spawn(async move {
                let result = handler.handle(&method, params).await;
                let Some(id) = id else { return };
                let response = match result {
                    Ok(value) => Frame::response(id, value),
                    Err(message) => Frame::error_response(id, message),
                };
                let _ = outgoing.send(response);
            });
        } else if let Some(id) = frame.id {
            let slot = pending.lock().remove(&id);
            match slot {
                Some(tx) => {
                    let result = match frame.error {
                        Some(message) => Err(PluginError::Rpc(message)),
                        None => Ok(frame.result.unwrap_or(Value::Null)),
                    };
                    let _ = tx.send(result);
                }
                None => debug!(id, "dropping response for abandoned call"),
            }
        }
    }
    shutdown.cancel();
    fail_pending(&pending);
}

fn fail_pending(pending: &Pending) {
    let slots: Vec<_> = pending.lock().drain().collect();
    for (_, tx) in slots {
        let _ = tx.send(Err(PluginError::ConnectionClosed));
    }
}
