// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Plugin self-description, returned from the `Metadata` handshake.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named capability one plugin offers to others.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDescriptor {
    pub name: String,
    pub description: String,
    pub methods: Vec<String>,
}

/// A CLI sub-command a plugin exposes through `plugin-cli`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliCommand {
    pub name: String,
    pub description: String,
    pub usage: String,
}

/// Everything the daemon learns about a plugin at handshake time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginMetadata {
    pub namespace: String,
    pub version: String,
    pub description: String,
    pub category: String,
    pub config_path: String,
    pub default_config: Option<Value>,
    /// Names of plugins this plugin depends on.
    pub dependencies: Vec<String>,
    /// Optional prefix inserted after the namespace on client paths.
    pub path_prefix: Option<String>,
    pub provided_services: Vec<ServiceDescriptor>,
    pub required_services: Vec<String>,
    pub cli_commands: Vec<CliCommand>,
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
