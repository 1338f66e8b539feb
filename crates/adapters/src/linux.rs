// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Production system adapter built on iproute2, sysctl, and nftables.

use std::net::Ipv4Addr;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use jack_core::{Interface, Route};

use crate::error::SystemError;
use crate::system::{KernelState, SystemAdapter};

/// Kernel writes via `ip(8)`, `sysctl(8)`, and `nft(8)`.
#[derive(Debug, Default, Clone)]
pub struct LinuxSystem;

impl LinuxSystem {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, program: &str, args: &[&str]) -> Result<String, SystemError> {
        let output = Command::new(program).args(args).output().await?;
        if !output.status.success() {
            return Err(SystemError::Command {
                command: format!("{program} {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run_json(&self, program: &str, args: &[&str]) -> Result<Value, SystemError> {
        let stdout = self.run(program, args).await?;
        if stdout.trim().is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        Ok(serde_json::from_str(&stdout)?)
    }

    /// Create the link when the configured type needs one and it is absent.
    async fn ensure_link(&self, device: &str, interface: &Interface) -> Result<(), SystemError> {
        if self.run("ip", &["link", "show", "dev", device]).await.is_ok() {
            return Ok(());
        }
        match interface.kind.as_str() {
            "bridge" => {
                self.run("ip", &["link", "add", "name", device, "type", "bridge"]).await?;
            }
            "vlan" => {
                // vlan devices are named parent.id
                let Some((parent, id)) = device.split_once('.') else {
                    return Err(SystemError::NoDevice(device.to_string()));
                };
                self.run(
                    "ip",
                    &["link", "add", "link", parent, "name", device, "type", "vlan", "id", id],
                )
                .await?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[async_trait]
impl SystemAdapter for LinuxSystem {
    async fn enable_ip_forwarding(&self) -> Result<(), SystemError> {
        self.run("sysctl", &["-w", "net.ipv4.ip_forward=1"]).await?;
        Ok(())
    }

    async fn apply_interface(
        &self,
        name: &str,
        interface: &Interface,
    ) -> Result<(), SystemError> {
        let device = effective_device(name, interface)?;

        if !interface.enabled {
            debug!(interface = name, device = %device, "bringing link down");
            self.run("ip", &["link", "set", "dev", &device, "down"]).await?;
            return Ok(());
        }

        self.ensure_link(&device, interface).await?;
        if interface.mtu > 0 {
            let mtu = interface.mtu.to_string();
            self.run("ip", &["link", "set", "dev", &device, "mtu", &mtu]).await?;
        }
        self.run("ip", &["link", "set", "dev", &device, "up"]).await?;

        if interface.protocol == "static" && !interface.ipaddr.is_empty() {
            let cidr = address_with_prefix(interface);
            self.run("ip", &["addr", "replace", &cidr, "dev", &device]).await?;
            if !interface.gateway.is_empty() {
                self.run(
                    "ip",
                    &["route", "replace", "default", "via", &interface.gateway, "dev", &device],
                )
                .await?;
            }
        }
        Ok(())
    }

    async fn apply_route(&self, route: &Route) -> Result<(), SystemError> {
        let destination = route.normalized_destination();
        let mut args: Vec<String> =
            vec!["route".to_string(), "replace".to_string(), destination];
        if !route.gateway.is_empty() {
            args.push("via".to_string());
            args.push(route.gateway.clone());
        }
        if !route.interface.is_empty() {
            args.push("dev".to_string());
            args.push(route.interface.clone());
        }
        if route.metric > 0 {
            args.push("metric".to_string());
            args.push(route.metric.to_string());
        }
        if route.table > 0 {
            args.push("table".to_string());
            args.push(route.table.to_string());
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run("ip", &arg_refs).await?;
        Ok(())
    }

    async fn capture_state(&self) -> Result<KernelState, SystemError> {
        let links = self.run_json("ip", &["-j", "link", "show"]).await?;
        let addresses = self.run_json("ip", &["-j", "addr", "show"]).await?;
        let routes = self.run_json("ip", &["-j", "route", "show"]).await?;
        let ip_forward = self
            .run("sysctl", &["-n", "net.ipv4.ip_forward"])
            .await
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        // Firewall capture is best-effort; nft may be absent
        let firewall_rules = match self.run("nft", &["list", "ruleset"]).await {
            Ok(rules) => rules,
            Err(e) => {
                debug!(error = %e, "firewall ruleset capture skipped");
                String::new()
            }
        };

        Ok(KernelState {
            state: json!({
                "links": links,
                "addresses": addresses,
                "routes": routes,
                "ip_forward": ip_forward,
            }),
            firewall_rules,
        })
    }

    async fn restore_state(&self, state: &Value, scopes: &[String]) -> Result<(), SystemError> {
        let all = scopes.iter().any(|s| s == "all");
        let in_scope = |tag: &str| all || scopes.iter().any(|s| s == tag);

        if in_scope("ipforward") {
            if let Some(value) = state.get("ip_forward").and_then(Value::as_str) {
                let setting = format!("net.ipv4.ip_forward={value}");
                if let Err(e) = self.run("sysctl", &["-w", &setting]).await {
                    warn!(error = %e, "restore: ip_forward failed");
                }
            }
        }

        if in_scope("interfaces") {
            for link in state.get("links").and_then(Value::as_array).into_iter().flatten() {
                let Some(name) = link.get("ifname").and_then(Value::as_str) else { continue };
                let up = link
                    .get("flags")
                    .and_then(Value::as_array)
                    .is_some_and(|flags| flags.iter().any(|f| f.as_str() == Some("UP")));
                let action = if up { "up" } else { "down" };
                if let Err(e) = self.run("ip", &["link", "set", "dev", name, action]).await {
                    warn!(link = name, error = %e, "restore: link state failed");
                }
                if let Some(mtu) = link.get("mtu").and_then(Value::as_u64) {
                    let mtu = mtu.to_string();
                    if let Err(e) =
                        self.run("ip", &["link", "set", "dev", name, "mtu", &mtu]).await
                    {
                        warn!(link = name, error = %e, "restore: mtu failed");
                    }
                }
            }
            for entry in state.get("addresses").and_then(Value::as_array).into_iter().flatten() {
                let Some(dev) = entry.get("ifname").and_then(Value::as_str) else { continue };
                for info in entry.get("addr_info").and_then(Value::as_array).into_iter().flatten()
                {
                    let (Some(local), Some(prefix)) = (
                        info.get("local").and_then(Value::as_str),
                        info.get("prefixlen").and_then(Value::as_u64),
                    ) else {
                        continue;
                    };
                    let cidr = format!("{local}/{prefix}");
                    if let Err(e) =
                        self.run("ip", &["addr", "replace", &cidr, "dev", dev]).await
                    {
                        warn!(link = dev, error = %e, "restore: address failed");
                    }
                }
            }
        }

        if in_scope("routes") {
            for route in state.get("routes").and_then(Value::as_array).into_iter().flatten() {
                let Some(dst) = route.get("dst").and_then(Value::as_str) else { continue };
                let mut args: Vec<String> =
                    vec!["route".to_string(), "replace".to_string(), dst.to_string()];
                if let Some(gateway) = route.get("gateway").and_then(Value::as_str) {
                    args.push("via".to_string());
                    args.push(gateway.to_string());
                }
                if let Some(dev) = route.get("dev").and_then(Value::as_str) {
                    args.push("dev".to_string());
                    args.push(dev.to_string());
                }
                let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
                if let Err(e) = self.run("ip", &arg_refs).await {
                    warn!(route = dst, error = %e, "restore: route failed");
                }
            }
        }
        Ok(())
    }

    async fn restore_firewall(&self, ruleset: &str) -> Result<(), SystemError> {
        if ruleset.is_empty() {
            return Ok(());
        }
        let mut child = Command::new("nft")
            .args(["-f", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(ruleset.as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(SystemError::Command {
                command: "nft -f -".to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// The kernel link a config entry manages: `device`, else `device_name`,
/// else the logical name.
fn effective_device(name: &str, interface: &Interface) -> Result<String, SystemError> {
    if !interface.device.is_empty() {
        return Ok(interface.device.clone());
    }
    if !interface.device_name.is_empty() {
        return Ok(interface.device_name.clone());
    }
    if !name.is_empty() {
        return Ok(name.to_string());
    }
    Err(SystemError::NoDevice(name.to_string()))
}

/// `ipaddr` with a prefix: keep an explicit `/p`, else derive from the
/// netmask, else assume a host address.
fn address_with_prefix(interface: &Interface) -> String {
    if interface.ipaddr.contains('/') {
        return interface.ipaddr.clone();
    }
    let prefix = netmask_prefix(&interface.netmask).unwrap_or(32);
    format!("{}/{}", interface.ipaddr, prefix)
}

fn netmask_prefix(netmask: &str) -> Option<u8> {
    let mask: Ipv4Addr = netmask.parse().ok()?;
    Some(u32::from(mask).count_ones() as u8)
}

#[cfg(test)]
#[path = "linux_tests.rs"]
mod tests;
