// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Listener task for handling socket I/O.
//!
//! The listener accepts connections and handles each on its own task, so a
//! slow plugin RPC only blocks its own request. `logs-subscribe` upgrades
//! the connection into a one-way stream of log entries.

mod info;
mod transaction;

use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, BufReader};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::apply;
use crate::daemon::Daemon;
use crate::env::ipc_timeout;
use crate::manager;
use crate::protocol::{self, Command, Request, Response};

/// Errors from connection handling.
#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),
}

/// Listener task for accepting socket connections.
pub struct Listener {
    unix: UnixListener,
    daemon: Arc<Daemon>,
}

impl Listener {
    pub fn new(unix: UnixListener, daemon: Arc<Daemon>) -> Self {
        Self { unix, daemon }
    }

    /// Run the accept loop, spawning a task per connection.
    pub async fn run(self) {
        loop {
            match self.unix.accept().await {
                Ok((stream, _)) => {
                    let daemon = Arc::clone(&self.daemon);
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        if let Err(e) = handle_connection(reader, writer, &daemon).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!("accept error: {}", e),
            }
        }
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(protocol::ProtocolError::ConnectionClosed) => {
            debug!("client disconnected")
        }
        _ => error!("connection error: {}", e),
    }
}

/// Handle a single client connection.
///
/// Races the handler against client-disconnect detection: a client that
/// gives up cancels the in-flight plugin calls instead of leaking them.
/// Generic over the stream halves so tests drive it with in-memory pipes.
pub(crate) async fn handle_connection<R, W>(
    reader: R,
    mut writer: W,
    daemon: &Arc<Daemon>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let request = protocol::read_request(&mut reader, ipc_timeout()).await?;
    info!(command = ?request.command, "received request");

    // logs-subscribe upgrades the connection into a log stream
    if request.command == Command::LogsSubscribe {
        return stream_logs(reader, writer, request.log_filter.as_deref(), daemon).await;
    }

    let token = CancellationToken::new();
    let response = tokio::select! {
        response = handle_request(request, daemon, token.clone()) => response,
        _ = detect_client_disconnect(&mut reader) => {
            token.cancel();
            debug!("client disconnected, cancelling handler");
            return Ok(());
        }
    };

    protocol::write_response(&mut writer, &response, ipc_timeout()).await?;
    Ok(())
}

/// Detect client disconnect by reading after the request; the protocol is
/// one request per connection, so any read completion means EOF.
async fn detect_client_disconnect<R: AsyncReadExt + Unpin>(reader: &mut R) {
    let mut buf = [0u8; 1];
    let _ = reader.read(&mut buf).await;
}

/// Stream log entries until the client closes its end.
async fn stream_logs<R, W>(
    mut reader: BufReader<R>,
    mut writer: W,
    filter: Option<&str>,
    daemon: &Arc<Daemon>,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut entries = daemon.logs.subscribe();
    loop {
        tokio::select! {
            _ = detect_client_disconnect(&mut reader) => {
                debug!("log stream client disconnected");
                return Ok(());
            }
            entry = entries.recv() => match entry {
                Ok(entry) => {
                    if let Some(filter) = filter {
                        if !entry.passes_filter(filter) {
                            continue;
                        }
                    }
                    protocol::write_json_line(&mut writer, &entry, ipc_timeout()).await?;
                }
                // Skipped entries under load are acceptable on this stream
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

/// Dispatch one request to its handler.
async fn handle_request(
    request: Request,
    daemon: &Arc<Daemon>,
    cancel: CancellationToken,
) -> Response {
    match request.command {
        Command::Status => transaction::handle_status(daemon),

        Command::Info => info::handle_info(daemon, &cancel).await,

        Command::Diff => transaction::handle_diff(daemon),

        Command::Commit => transaction::handle_commit(daemon, &cancel).await,

        Command::Revert => transaction::handle_revert(daemon),

        Command::Apply => apply::handle_apply(daemon, &cancel).await,

        Command::Show => transaction::handle_show(daemon, request.path.as_deref()),

        Command::Get => transaction::handle_get(daemon, request.path.as_deref()),

        Command::Set => {
            transaction::handle_set(daemon, request.path.as_deref(), request.value)
        }

        Command::Validate => {
            transaction::handle_validate(daemon, request.path.as_deref(), request.value)
        }

        Command::PluginEnable => match request.plugin.as_deref() {
            Some(name) => manager::handle_plugin_enable(daemon, name).await,
            None => Response::failed("missing plugin name"),
        },

        Command::PluginDisable => match request.plugin.as_deref() {
            Some(name) => manager::handle_plugin_disable(daemon, name, &cancel).await,
            None => Response::failed("missing plugin name"),
        },

        Command::PluginRescan => manager::handle_plugin_rescan(daemon).await,

        Command::PluginCli => match (request.plugin.as_deref(), request.cli_command.as_deref())
        {
            (Some(name), Some(command)) => {
                manager::handle_plugin_cli(daemon, name, command, &request.cli_args, &cancel)
                    .await
            }
            _ => Response::failed("missing plugin name or command"),
        },

        Command::Rollback => {
            apply::handle_rollback(daemon, request.checkpoint_id.as_deref(), &cancel).await
        }

        Command::CheckpointList => apply::handle_checkpoint_list(daemon),

        Command::CheckpointCreate => apply::handle_checkpoint_create(daemon).await,

        // Intercepted in handle_connection before reaching handle_request
        Command::LogsSubscribe => Response::failed("logs-subscribe is a streaming command"),
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures;

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
