// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::request::{Request, Response};

/// Requests larger than this are rejected rather than buffered.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Errors from socket framing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("timed out")]
    Timeout,

    #[error("request too large")]
    TooLarge,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one request line with a timeout.
pub async fn read_request<R>(
    reader: &mut BufReader<R>,
    timeout: Duration,
) -> Result<Request, ProtocolError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let line = read_line(reader, timeout).await?;
    Ok(serde_json::from_str(&line)?)
}

async fn read_line<R>(
    reader: &mut BufReader<R>,
    timeout: Duration,
) -> Result<String, ProtocolError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    let read = tokio::time::timeout(timeout, reader.read_line(&mut line))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    if read == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }
    if line.len() > MAX_LINE_BYTES {
        return Err(ProtocolError::TooLarge);
    }
    Ok(line)
}

/// Write one response line with a timeout.
pub async fn write_response<W>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_json_line(writer, response, timeout).await
}

/// Write any serializable value as one line. Used for the response and for
/// streamed log entries.
pub async fn write_json_line<W, T>(
    writer: &mut W,
    value: &T,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    tokio::time::timeout(timeout, async {
        writer.write_all(&line).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| ProtocolError::Timeout)??;
    Ok(())
}
