// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Static route configuration.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{coerce_bool, coerce_string, coerce_u32};
use crate::error::CoreError;

/// A static route, keyed by name in the config map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    /// Mirrors the map key. Read-only through the path engine.
    pub name: String,
    /// CIDR, address, or the literal `default` (an alias for `0.0.0.0/0`).
    pub destination: String,
    pub gateway: String,
    pub interface: String,
    pub metric: u32,
    /// 0 means unspecified.
    pub table: u32,
    pub enabled: bool,
    pub comment: String,
}

/// Serialization tags, in declaration order.
pub const ROUTE_FIELDS: &[&str] =
    &["name", "destination", "gateway", "interface", "metric", "table", "enabled", "comment"];

impl Route {
    /// A default route skeleton for auto-creation on first field write.
    pub fn named(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    /// Read a field by its serialization tag.
    pub fn get_field(&self, tag: &str) -> Result<Value, CoreError> {
        match tag {
            "name" => Ok(Value::String(self.name.clone())),
            "destination" => Ok(Value::String(self.destination.clone())),
            "gateway" => Ok(Value::String(self.gateway.clone())),
            "interface" => Ok(Value::String(self.interface.clone())),
            "metric" => Ok(Value::Number(self.metric.into())),
            "table" => Ok(Value::Number(self.table.into())),
            "enabled" => Ok(Value::Bool(self.enabled)),
            "comment" => Ok(Value::String(self.comment.clone())),
            _ => Err(CoreError::UnknownField(tag.to_string())),
        }
    }

    /// Write a field by its serialization tag. `name` mirrors the map key and
    /// is rejected.
    pub fn set_field(&mut self, tag: &str, value: &Value) -> Result<(), CoreError> {
        match tag {
            "name" => return Err(CoreError::ReadOnlyField("name")),
            "destination" => self.destination = coerce_string("destination", value)?,
            "gateway" => self.gateway = coerce_string("gateway", value)?,
            "interface" => self.interface = coerce_string("interface", value)?,
            "metric" => self.metric = coerce_u32("metric", value)?,
            "table" => self.table = coerce_u32("table", value)?,
            "enabled" => self.enabled = coerce_bool("enabled", value)?,
            "comment" => self.comment = coerce_string("comment", value)?,
            _ => return Err(CoreError::UnknownField(tag.to_string())),
        }
        Ok(())
    }

    /// Canonical form of this route's destination.
    pub fn normalized_destination(&self) -> String {
        normalize_destination(&self.destination)
    }

    /// Validate the route configuration.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.destination.is_empty() {
            return Err(CoreError::Invalid("destination is required".to_string()));
        }
        if self.destination != "default" && !parses_as_destination(&self.destination) {
            return Err(CoreError::Invalid(format!(
                "destination '{}' is not valid",
                self.destination
            )));
        }
        if !self.gateway.is_empty() && self.gateway.parse::<std::net::IpAddr>().is_err() {
            return Err(CoreError::Invalid(format!("gateway '{}' is not valid", self.gateway)));
        }
        Ok(())
    }
}

fn parses_as_destination(dest: &str) -> bool {
    match dest.split_once('/') {
        Some((addr, prefix)) => {
            let bits: Option<u8> = prefix.parse().ok();
            match (addr.parse::<std::net::IpAddr>(), bits) {
                (Ok(ip), Some(bits)) => bits <= if ip.is_ipv4() { 32 } else { 128 },
                _ => false,
            }
        }
        None => dest.parse::<std::net::IpAddr>().is_ok(),
    }
}

/// Canonicalise a destination: `default` aliases `0.0.0.0/0`, bare addresses
/// get a host prefix, and host bits below the prefix are masked off. Values
/// that do not parse are returned verbatim so comparison falls back to
/// literal string equality.
pub fn normalize_destination(dest: &str) -> String {
    if dest == "default" {
        return "0.0.0.0/0".to_string();
    }
    let (addr, prefix) = match dest.split_once('/') {
        Some((a, p)) => match (a.parse::<Ipv4Addr>(), p.parse::<u8>()) {
            (Ok(ip), Ok(bits)) if bits <= 32 => (ip, bits),
            _ => return dest.to_string(),
        },
        None => match dest.parse::<Ipv4Addr>() {
            Ok(ip) => (ip, 32),
            Err(_) => return dest.to_string(),
        },
    };
    format!("{}/{}", mask_host_bits(addr, prefix), prefix)
}

fn mask_host_bits(addr: Ipv4Addr, prefix: u8) -> Ipv4Addr {
    if prefix == 0 {
        return Ipv4Addr::UNSPECIFIED;
    }
    let mask: u32 = !0u32 << (32 - u32::from(prefix));
    Ipv4Addr::from(u32::from(addr) & mask)
}

/// Compare two destinations in canonical form.
pub fn destinations_equal(a: &str, b: &str) -> bool {
    normalize_destination(a) == normalize_destination(b)
}

#[cfg(test)]
#[path = "route_tests.rs"]
mod tests;
