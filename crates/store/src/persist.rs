// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! On-disk configuration: one JSON file per namespace (core types) or
//! plugin name (plugin configs), plus the daemon settings file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Filename stem of the daemon settings file.
const SETTINGS_FILE: &str = "jack";

/// A directory of per-namespace JSON config files.
#[derive(Debug, Clone)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}.json"))
    }

    /// Load one config file. Missing files are `None`, not an error.
    pub fn load(&self, stem: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(stem);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };
        serde_json::from_slice(&data).map(Some).map_err(|e| StoreError::Json { path, source: e })
    }

    /// Atomically write one config file (temp file + rename).
    pub fn save(&self, stem: &str, value: &Value) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| StoreError::Io { path: self.root.clone(), source: e })?;
        let path = self.path_for(stem);
        let tmp = self.root.join(format!(".{stem}.json.tmp"));
        let data = serde_json::to_vec_pretty(value)
            .map_err(|e| StoreError::Json { path: path.clone(), source: e })?;
        fs::write(&tmp, data).map_err(|e| StoreError::Io { path: tmp.clone(), source: e })?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::Io { path, source: e })
    }

    /// Stems of every JSON file in the directory, sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io { path: self.root.clone(), source: e }),
        };
        let mut stems = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    stems.push(stem.to_string());
                }
            }
        }
        stems.sort();
        Ok(stems)
    }
}

/// Per-plugin enable state persisted in the settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginState {
    pub enabled: bool,
    #[serde(default)]
    pub version: String,
}

/// Drift observer knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverSettings {
    pub auto_reconcile: bool,
    /// 0 means "use the built-in default" (60 s).
    pub reconcile_interval_ms: u64,
}

/// Daemon-level settings: plugin enable states and observer knobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub plugins: BTreeMap<String, PluginState>,
    pub observer: ObserverSettings,
}

impl DaemonSettings {
    /// Load from the settings file, defaulting when absent.
    pub fn load(dir: &ConfigDir) -> Result<Self, StoreError> {
        match dir.load(SETTINGS_FILE)? {
            Some(value) => {
                let path = dir.path_for(SETTINGS_FILE);
                serde_json::from_value(value).map_err(|e| StoreError::Json { path, source: e })
            }
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, dir: &ConfigDir) -> Result<(), StoreError> {
        let path = dir.path_for(SETTINGS_FILE);
        let value =
            serde_json::to_value(self).map_err(|e| StoreError::Json { path, source: e })?;
        dir.save(SETTINGS_FILE, &value)
    }

    /// As a generic config value for the `jack` namespace.
    pub fn to_config_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
