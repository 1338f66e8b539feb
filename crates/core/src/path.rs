// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Dotted-path addressing into config values.
//!
//! Paths have the shape `ns[.key[.field]]` for the typed namespaces and
//! `ns[.key]*` for generic ones. The first segment is always the namespace.

use serde_json::Value;

use crate::config::Config;
use crate::error::CoreError;
use crate::interface::{Interface, ACCEPTED_TYPES};
use crate::route::Route;

/// A parsed dotted path. The first segment is the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    segments: Vec<String>,
}

impl ConfigPath {
    /// Parse a dotted path. Empty paths and empty segments are rejected.
    pub fn parse(path: &str) -> Result<Self, CoreError> {
        if path.is_empty() {
            return Err(CoreError::InvalidPath);
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(CoreError::InvalidPath);
        }
        Ok(Self { segments })
    }

    pub fn namespace(&self) -> &str {
        &self.segments[0]
    }

    /// Segments after the namespace.
    pub fn rest(&self) -> &[String] {
        &self.segments[1..]
    }

    /// Insert a plugin-declared prefix directly after the namespace:
    /// `ns.rest...` becomes `ns.prefix.rest...`.
    pub fn with_prefix(&self, prefix: &str) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.push(self.segments[0].clone());
        segments.push(prefix.to_string());
        segments.extend(self.segments[1..].iter().cloned());
        Self { segments }
    }
}

impl std::fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Extract the namespace from a dotted path.
pub fn parse_config_type(path: &str) -> Result<String, CoreError> {
    Ok(ConfigPath::parse(path)?.namespace().to_string())
}

/// Read the value at `path` within `config`.
pub fn get(config: &Config, path: &ConfigPath) -> Result<Value, CoreError> {
    let rest = path.rest();
    match config {
        Config::Interfaces(map) => match rest {
            [] => Ok(config.to_value()),
            [key] => {
                let iface =
                    map.get(key).ok_or_else(|| CoreError::InterfaceNotFound(key.clone()))?;
                serde_json::to_value(iface)
                    .map_err(|e| CoreError::Shape { kind: "interfaces", source: e })
            }
            [key, field] => {
                let iface =
                    map.get(key).ok_or_else(|| CoreError::InterfaceNotFound(key.clone()))?;
                iface.get_field(field)
            }
            _ => Err(CoreError::InvalidPath),
        },
        Config::Routes(map) => match rest {
            [] => Ok(config.to_value()),
            [key] => {
                let route = map.get(key).ok_or_else(|| CoreError::RouteNotFound(key.clone()))?;
                serde_json::to_value(route)
                    .map_err(|e| CoreError::Shape { kind: "routes", source: e })
            }
            [key, field] => {
                let route = map.get(key).ok_or_else(|| CoreError::RouteNotFound(key.clone()))?;
                route.get_field(field)
            }
            _ => Err(CoreError::InvalidPath),
        },
        Config::Generic(value) => {
            let mut current = value;
            for segment in rest {
                match current {
                    Value::Object(map) => {
                        current = map
                            .get(segment)
                            .ok_or_else(|| CoreError::KeyNotFound(segment.clone()))?;
                    }
                    // Descending into a non-map yields the non-map value
                    // at that depth.
                    _ => return Ok(current.clone()),
                }
            }
            Ok(current.clone())
        }
    }
}

/// Write `value` at `path` within `config`.
pub fn set(config: &mut Config, path: &ConfigPath, value: Value) -> Result<(), CoreError> {
    let rest: Vec<String> = path.rest().to_vec();
    match config {
        Config::Interfaces(map) => match rest.as_slice() {
            [] => {
                // Whole-collection replacement coerces strong or loose maps
                // through serde.
                *map = serde_json::from_value(value)
                    .map_err(|e| CoreError::Shape { kind: "interfaces", source: e })?;
                Ok(())
            }
            [key] => {
                let iface: Interface = serde_json::from_value(value)
                    .map_err(|e| CoreError::Shape { kind: "interfaces", source: e })?;
                map.insert(key.clone(), iface);
                Ok(())
            }
            [key, field] => {
                let iface =
                    map.get_mut(key).ok_or_else(|| CoreError::InterfaceNotFound(key.clone()))?;
                iface.set_field(field, &value)
            }
            _ => Err(CoreError::InvalidPath),
        },
        Config::Routes(map) => match rest.as_slice() {
            [] => {
                *map = serde_json::from_value(value)
                    .map_err(|e| CoreError::Shape { kind: "routes", source: e })?;
                Ok(())
            }
            [key] => {
                let route: Route = serde_json::from_value(value)
                    .map_err(|e| CoreError::Shape { kind: "routes", source: e })?;
                map.insert(key.clone(), route);
                Ok(())
            }
            [key, field] => {
                // Unknown routes are auto-created with defaults; the write is
                // applied to a scratch copy so a failed write leaves the map
                // untouched.
                let mut route = map.get(key).cloned().unwrap_or_else(|| Route::named(key));
                route.set_field(field, &value)?;
                map.insert(key.clone(), route);
                Ok(())
            }
            _ => Err(CoreError::InvalidPath),
        },
        Config::Generic(root) => {
            if rest.is_empty() {
                *root = value;
                return Ok(());
            }
            set_generic(root, path.namespace(), &rest, value)
        }
    }
}

/// Recursive map write. The final key may be created; missing intermediate
/// keys fail.
fn set_generic(
    current: &mut Value,
    parent: &str,
    segments: &[String],
    value: Value,
) -> Result<(), CoreError> {
    let map = match current {
        Value::Object(map) => map,
        _ => return Err(CoreError::NotAnObject(parent.to_string())),
    };
    match segments {
        [last] => {
            map.insert(last.clone(), value);
            Ok(())
        }
        [head, tail @ ..] => {
            let next = map.get_mut(head).ok_or_else(|| CoreError::KeyNotFound(head.clone()))?;
            set_generic(next, head, tail, value)
        }
        [] => Err(CoreError::InvalidPath),
    }
}

/// Structurally type-check a prospective write without mutating state.
///
/// Runs the write against a scratch copy of `current` (or an empty config),
/// then checks that every affected interface carries an accepted `type`.
pub fn validate_value(
    namespace: &str,
    path: &ConfigPath,
    value: Value,
    current: Option<&Config>,
) -> Result<(), CoreError> {
    let mut scratch = match current {
        Some(config) => config.clone(),
        None => Config::empty(namespace),
    };
    set(&mut scratch, path, value)?;

    if let Config::Interfaces(map) = &scratch {
        let affected: Vec<&String> = match path.rest().first() {
            Some(key) => map.keys().filter(|k| *k == key).collect(),
            None => map.keys().collect(),
        };
        for key in affected {
            if let Some(iface) = map.get(key) {
                if !ACCEPTED_TYPES.contains(&iface.kind.as_str()) {
                    return Err(CoreError::Invalid(format!(
                        "{}: type '{}' is not one of: {}",
                        key,
                        iface.kind,
                        ACCEPTED_TYPES.join(", ")
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
