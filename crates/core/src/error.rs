// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Error types shared across the core data model.

use thiserror::Error;

/// Errors from path resolution, typed field access, and validation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid path")]
    InvalidPath,

    #[error("unknown config type: {0}")]
    UnknownConfigType(String),

    #[error("key '{0}' not found")]
    KeyNotFound(String),

    #[error("interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("route '{0}' not found")]
    RouteNotFound(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("{field} must be a {kind}")]
    FieldType { field: &'static str, kind: &'static str },

    #[error("field '{0}' is read-only")]
    ReadOnlyField(&'static str),

    #[error("'{0}' is not an object")]
    NotAnObject(String),

    #[error("invalid {kind} config: {source}")]
    Shape {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Invalid(String),
}
