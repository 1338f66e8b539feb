// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Per-namespace config values.
//!
//! The `interfaces` and `routes` namespaces are strongly typed; every other
//! namespace (plugins, daemon settings) carries free-form JSON.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::CoreError;
use crate::interface::Interface;
use crate::route::Route;

/// Namespace for interface configuration.
pub const INTERFACES_NAMESPACE: &str = "interfaces";
/// Namespace for static route configuration.
pub const ROUTES_NAMESPACE: &str = "routes";
/// Namespace for daemon-level settings (plugin states, observer knobs).
pub const JACK_NAMESPACE: &str = "jack";

/// One namespace's configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Config {
    Interfaces(BTreeMap<String, Interface>),
    Routes(BTreeMap<String, Route>),
    Generic(Value),
}

impl Config {
    /// Build a config for `namespace` from a JSON value.
    ///
    /// Typed namespaces coerce through serde, so both strongly-typed and
    /// loosely-typed maps are accepted.
    pub fn from_value(namespace: &str, value: Value) -> Result<Self, CoreError> {
        match namespace {
            INTERFACES_NAMESPACE => {
                let map = serde_json::from_value(value)
                    .map_err(|e| CoreError::Shape { kind: "interfaces", source: e })?;
                Ok(Config::Interfaces(map))
            }
            ROUTES_NAMESPACE => {
                let map = serde_json::from_value(value)
                    .map_err(|e| CoreError::Shape { kind: "routes", source: e })?;
                Ok(Config::Routes(map))
            }
            _ => Ok(Config::Generic(value)),
        }
    }

    /// Empty config for a namespace.
    pub fn empty(namespace: &str) -> Self {
        match namespace {
            INTERFACES_NAMESPACE => Config::Interfaces(BTreeMap::new()),
            ROUTES_NAMESPACE => Config::Routes(BTreeMap::new()),
            _ => Config::Generic(Value::Object(serde_json::Map::new())),
        }
    }

    /// Serialize to a JSON value.
    ///
    /// Serialization of the typed maps cannot fail; the fallback is never hit
    /// in practice.
    pub fn to_value(&self) -> Value {
        match self {
            Config::Interfaces(map) => serde_json::to_value(map).unwrap_or(Value::Null),
            Config::Routes(map) => serde_json::to_value(map).unwrap_or(Value::Null),
            Config::Generic(value) => value.clone(),
        }
    }

    pub fn as_interfaces(&self) -> Option<&BTreeMap<String, Interface>> {
        match self {
            Config::Interfaces(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_routes(&self) -> Option<&BTreeMap<String, Route>> {
        match self {
            Config::Routes(map) => Some(map),
            _ => None,
        }
    }
}

/// Canonical-JSON equality: key order and representation differences
/// (e.g. `1500` vs `1500.0` after a round-trip) do not matter.
pub fn configs_equal(a: &Config, b: &Config) -> bool {
    a.to_value() == b.to_value()
}

// Field coercion helpers shared by the typed structs. JSON round-trips can
// widen integers to floats, so numbers are accepted in either form.

pub(crate) fn coerce_string(field: &'static str, value: &Value) -> Result<String, CoreError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(CoreError::FieldType { field, kind: "string" }),
    }
}

pub(crate) fn coerce_bool(field: &'static str, value: &Value) -> Result<bool, CoreError> {
    match value {
        Value::Bool(b) => Ok(*b),
        _ => Err(CoreError::FieldType { field, kind: "boolean" }),
    }
}

pub(crate) fn coerce_u32(field: &'static str, value: &Value) -> Result<u32, CoreError> {
    let n = match value {
        Value::Number(n) => n,
        _ => return Err(CoreError::FieldType { field, kind: "number" }),
    };
    if let Some(u) = n.as_u64() {
        return u32::try_from(u).map_err(|_| CoreError::FieldType { field, kind: "number" });
    }
    // Float with no fractional part, e.g. 1500.0 from a JSON round-trip
    if let Some(f) = n.as_f64() {
        if f.fract() == 0.0 && f >= 0.0 && f <= f64::from(u32::MAX) {
            return Ok(f as u32);
        }
    }
    Err(CoreError::FieldType { field, kind: "number" })
}
