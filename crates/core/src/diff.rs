// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Structural config diffing and the human-readable diff format.

use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::interface::INTERFACE_FIELDS;

/// How a path changed between two configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Modified,
}

/// One changed path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
    pub kind: DiffKind,
}

impl DiffEntry {
    fn added(path: String, new: Value) -> Self {
        Self { path, old: None, new: Some(new), kind: DiffKind::Added }
    }

    fn removed(path: String, old: Value) -> Self {
        Self { path, old: Some(old), new: None, kind: DiffKind::Removed }
    }

    fn modified(path: String, old: Value, new: Value) -> Self {
        Self { path, old: Some(old), new: Some(new), kind: DiffKind::Modified }
    }
}

/// Diff two configs for one namespace.
///
/// Interfaces diff by key first, then field-by-field per surviving pair.
/// Every other config type takes the structural walk over its JSON form.
pub fn diff_configs(namespace: &str, old: &Config, new: &Config) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    match (old, new) {
        (Config::Interfaces(old_map), Config::Interfaces(new_map)) => {
            let mut keys: Vec<&String> = old_map.keys().chain(new_map.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let path = format!("{namespace}.{key}");
                match (old_map.get(key), new_map.get(key)) {
                    (Some(iface), None) => {
                        entries.push(DiffEntry::removed(path, to_value_lossy(iface)));
                    }
                    (None, Some(iface)) => {
                        entries.push(DiffEntry::added(path, to_value_lossy(iface)));
                    }
                    (Some(a), Some(b)) => {
                        for tag in INTERFACE_FIELDS {
                            let old_field = a.get_field(tag).unwrap_or(Value::Null);
                            let new_field = b.get_field(tag).unwrap_or(Value::Null);
                            if old_field != new_field {
                                entries.push(DiffEntry::modified(
                                    format!("{path}.{tag}"),
                                    old_field,
                                    new_field,
                                ));
                            }
                        }
                    }
                    (None, None) => {}
                }
            }
        }
        _ => diff_value(namespace, &old.to_value(), &new.to_value(), &mut entries),
    }
    entries
}

fn to_value_lossy<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Structural walk. Equal subtrees are suppressed, which also covers fields
/// that are zero on both sides.
fn diff_value(path: &str, old: &Value, new: &Value, entries: &mut Vec<DiffEntry>) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            let mut keys: Vec<&String> = old_map.keys().chain(new_map.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let child = format!("{path}.{key}");
                match (old_map.get(key), new_map.get(key)) {
                    (Some(value), None) => entries.push(DiffEntry::removed(child, value.clone())),
                    (None, Some(value)) => entries.push(DiffEntry::added(child, value.clone())),
                    (Some(a), Some(b)) => diff_value(&child, a, b, entries),
                    (None, None) => {}
                }
            }
        }
        _ => entries.push(DiffEntry::modified(path.to_string(), old.clone(), new.clone())),
    }
}

/// Render a diff for humans.
pub fn format_diff(entries: &[DiffEntry]) -> String {
    if entries.is_empty() {
        return "No changes".to_string();
    }
    let mut out = format!("Found {} change(s):", entries.len());
    for entry in entries {
        out.push('\n');
        match entry.kind {
            DiffKind::Added => out.push_str(&format!("+ {} (added)", entry.path)),
            DiffKind::Removed => out.push_str(&format!("- {} (removed)", entry.path)),
            DiffKind::Modified => out.push_str(&format!(
                "~ {}: {} → {}",
                entry.path,
                format_value(entry.old.as_ref()),
                format_value(entry.new.as_ref())
            )),
        }
    }
    out
}

fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "(none)".to_string(),
        Some(Value::String(s)) if s.is_empty() => "(empty)".to_string(),
        Some(Value::String(s)) => format!("\"{s}\""),
        Some(Value::Array(a)) if a.is_empty() => "(empty)".to_string(),
        Some(Value::Object(m)) if m.is_empty() => "(empty)".to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
