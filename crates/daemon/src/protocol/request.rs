// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    Status,
    Info,
    Diff,
    Commit,
    Revert,
    Apply,
    Show,
    Get,
    Set,
    Validate,
    PluginEnable,
    PluginDisable,
    PluginRescan,
    PluginCli,
    Rollback,
    CheckpointList,
    CheckpointCreate,
    LogsSubscribe,
}

/// One request line from a client. Unused fields are omitted on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cli_args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Request {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            path: None,
            value: None,
            plugin: None,
            cli_command: None,
            cli_args: Vec::new(),
            checkpoint_id: None,
            log_filter: None,
        }
    }
}

/// One response line to a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn ok() -> Self {
        Self { success: true, ..Self::default() }
    }

    pub fn ok_message(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), ..Self::default() }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self { success: false, error: error.to_string(), ..Self::default() }
    }
}
