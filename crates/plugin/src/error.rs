// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use std::time::Duration;

use thiserror::Error;

/// The benign error a plugin returns when it has no log event handler.
pub const LOG_EVENTS_NOT_IMPLEMENTED: &str = "plugin does not implement log event handling";

/// Errors from plugin loading, RPC, and the registries.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin '{0}' not found")]
    NotFound(String),

    #[error("namespace '{0}' is already registered")]
    DuplicateNamespace(String),

    #[error("service '{name}' is already provided by '{provider}'")]
    DuplicateService { name: String, provider: String },

    #[error("service '{0}' has no provider")]
    NoProvider(String),

    #[error("plugin '{plugin}' requires unavailable service(s): {services}")]
    MissingServices { plugin: String, services: String },

    #[error("cannot disable '{name}': required by {dependents}")]
    Dependents { name: String, dependents: String },

    #[error("plugin rpc failed: {0}")]
    Rpc(String),

    #[error("plugin call timed out after {0:?}")]
    Timeout(Duration),

    #[error("call cancelled")]
    Cancelled,

    #[error("plugin connection closed")]
    ConnectionClosed,

    #[error("invalid plugin metadata: {0}")]
    Metadata(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PluginError {
    /// Whether this is the benign "no log handler" signal.
    pub fn is_log_events_not_implemented(&self) -> bool {
        matches!(self, PluginError::Rpc(msg) if msg == LOG_EVENTS_NOT_IMPLEMENTED)
    }
}
