// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Network interface configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{coerce_bool, coerce_string, coerce_u32};
use crate::error::CoreError;

/// Interface types accepted by validation.
pub const ACCEPTED_TYPES: &[&str] = &["physical", "bridge", "vlan", "other"];
/// Address protocols accepted by validation.
pub const ACCEPTED_PROTOCOLS: &[&str] = &["static", "dhcp", "none"];

/// A managed network interface, keyed by logical name in the config map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interface {
    /// One of `physical`, `bridge`, `vlan`, `other`. Kept as a string so
    /// an invalid value can be staged and rejected at commit time.
    #[serde(rename = "type")]
    pub kind: String,
    pub device: String,
    pub device_name: String,
    pub protocol: String,
    /// Address, optionally with a `/prefix` suffix.
    pub ipaddr: String,
    pub netmask: String,
    pub gateway: String,
    /// 0 means unspecified.
    pub mtu: u32,
    pub enabled: bool,
    pub comment: String,
}

/// Serialization tags, in declaration order. Field access goes through
/// `get_field`/`set_field`, which match on these tags.
pub const INTERFACE_FIELDS: &[&str] = &[
    "type",
    "device",
    "device_name",
    "protocol",
    "ipaddr",
    "netmask",
    "gateway",
    "mtu",
    "enabled",
    "comment",
];

impl Interface {
    /// Read a field by its serialization tag.
    pub fn get_field(&self, tag: &str) -> Result<Value, CoreError> {
        match tag {
            "type" => Ok(Value::String(self.kind.clone())),
            "device" => Ok(Value::String(self.device.clone())),
            "device_name" => Ok(Value::String(self.device_name.clone())),
            "protocol" => Ok(Value::String(self.protocol.clone())),
            "ipaddr" => Ok(Value::String(self.ipaddr.clone())),
            "netmask" => Ok(Value::String(self.netmask.clone())),
            "gateway" => Ok(Value::String(self.gateway.clone())),
            "mtu" => Ok(Value::Number(self.mtu.into())),
            "enabled" => Ok(Value::Bool(self.enabled)),
            "comment" => Ok(Value::String(self.comment.clone())),
            _ => Err(CoreError::UnknownField(tag.to_string())),
        }
    }

    /// Write a field by its serialization tag, coercing the JSON value.
    pub fn set_field(&mut self, tag: &str, value: &Value) -> Result<(), CoreError> {
        match tag {
            "type" => self.kind = coerce_string("type", value)?,
            "device" => self.device = coerce_string("device", value)?,
            "device_name" => self.device_name = coerce_string("device_name", value)?,
            "protocol" => self.protocol = coerce_string("protocol", value)?,
            "ipaddr" => self.ipaddr = coerce_string("ipaddr", value)?,
            "netmask" => self.netmask = coerce_string("netmask", value)?,
            "gateway" => self.gateway = coerce_string("gateway", value)?,
            "mtu" => self.mtu = coerce_u32("mtu", value)?,
            "enabled" => self.enabled = coerce_bool("enabled", value)?,
            "comment" => self.comment = coerce_string("comment", value)?,
            _ => return Err(CoreError::UnknownField(tag.to_string())),
        }
        Ok(())
    }

    /// Whether this interface manages the given kernel link name.
    pub fn matches_link(&self, link_name: &str) -> bool {
        (!self.device.is_empty() && self.device == link_name)
            || (!self.device_name.is_empty() && self.device_name == link_name)
    }

    /// The address portion of `ipaddr`, with any `/prefix` stripped.
    pub fn host_addr(&self) -> &str {
        self.ipaddr.split('/').next().unwrap_or("")
    }

    /// Validate the interface configuration.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !ACCEPTED_TYPES.contains(&self.kind.as_str()) {
            return Err(CoreError::Invalid(format!(
                "type '{}' is not one of: {}",
                self.kind,
                ACCEPTED_TYPES.join(", ")
            )));
        }
        if !self.protocol.is_empty() && !ACCEPTED_PROTOCOLS.contains(&self.protocol.as_str()) {
            return Err(CoreError::Invalid(format!(
                "protocol '{}' is not one of: {}",
                self.protocol,
                ACCEPTED_PROTOCOLS.join(", ")
            )));
        }
        if !self.ipaddr.is_empty() {
            parse_addr_with_prefix(&self.ipaddr)
                .map_err(|_| CoreError::Invalid(format!("ipaddr '{}' is not valid", self.ipaddr)))?;
        }
        if !self.netmask.is_empty() && self.netmask.parse::<std::net::IpAddr>().is_err() {
            return Err(CoreError::Invalid(format!("netmask '{}' is not valid", self.netmask)));
        }
        if !self.gateway.is_empty() && self.gateway.parse::<std::net::IpAddr>().is_err() {
            return Err(CoreError::Invalid(format!("gateway '{}' is not valid", self.gateway)));
        }
        if self.mtu != 0 && !(68..=65535).contains(&self.mtu) {
            return Err(CoreError::Invalid(format!("mtu {} is out of range", self.mtu)));
        }
        Ok(())
    }
}

/// Parse `addr` or `addr/prefix`.
fn parse_addr_with_prefix(s: &str) -> Result<(std::net::IpAddr, Option<u8>), ()> {
    let (addr, prefix) = match s.split_once('/') {
        Some((a, p)) => {
            let bits: u8 = p.parse().map_err(|_| ())?;
            (a, Some(bits))
        }
        None => (s, None),
    };
    let ip: std::net::IpAddr = addr.parse().map_err(|_| ())?;
    let max = if ip.is_ipv4() { 32 } else { 128 };
    if let Some(bits) = prefix {
        if bits > max {
            return Err(());
        }
    }
    Ok((ip, prefix))
}

/// Deterministic kernel application order: physical links first, then
/// bridges (which enslave them), then vlans, then everything else.
/// Names sort alphabetically within a class.
pub fn order_interfaces(interfaces: &BTreeMap<String, Interface>) -> Vec<String> {
    fn class_rank(kind: &str) -> u8 {
        match kind {
            "physical" => 0,
            "bridge" => 1,
            "vlan" => 2,
            _ => 3,
        }
    }

    // BTreeMap iteration is already name-sorted; the stable sort keeps that
    // order within each class.
    let mut names: Vec<String> = interfaces.keys().cloned().collect();
    names.sort_by_key(|name| interfaces.get(name).map_or(u8::MAX, |i| class_rank(&i.kind)));
    names
}

#[cfg(test)]
#[path = "interface_tests.rs"]
mod tests;
