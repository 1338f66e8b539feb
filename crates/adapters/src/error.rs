// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use thiserror::Error;

/// Errors from kernel writes, snapshots, and netlink subscriptions.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("command '{command}' failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("interface '{0}' has no device name")]
    NoDevice(String),

    #[error("netlink: {0}")]
    Netlink(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
