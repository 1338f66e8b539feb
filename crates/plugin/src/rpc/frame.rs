// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One wire frame: a request (`method` set) or a response (`result` or
/// `error` set), correlated by `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Frame {
    pub fn request(id: u64, method: &str, params: Value) -> Self {
        Self {
            id: Some(id),
            method: Some(method.to_string()),
            params: Some(params),
            ..Self::default()
        }
    }

    pub fn response(id: u64, result: Value) -> Self {
        Self { id: Some(id), result: Some(result), ..Self::default() }
    }

    pub fn error_response(id: u64, message: String) -> Self {
        Self { id: Some(id), error: Some(message), ..Self::default() }
    }
}
