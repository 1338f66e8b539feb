// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the state store, snapshot registry, and disk persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown config type: {0}")]
    UnknownConfigType(String),

    #[error("no pending changes")]
    NoPending,

    #[error("checkpoint '{0}' not found")]
    CheckpointNotFound(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Core(#[from] jack_core::CoreError),
}
