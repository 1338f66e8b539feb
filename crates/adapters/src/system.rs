// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Adapter traits and the typed kernel event model.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use jack_core::{Interface, Route};

use crate::error::SystemError;

/// A captured kernel state plus the firewall ruleset text.
#[derive(Debug, Clone)]
pub struct KernelState {
    pub state: Value,
    pub firewall_rules: String,
}

/// Kernel writes and snapshot capture/restore.
///
/// The concrete manipulations live behind this trait; the daemon core only
/// sequences them.
#[async_trait]
pub trait SystemAdapter: Send + Sync {
    async fn enable_ip_forwarding(&self) -> Result<(), SystemError>;

    /// Push one interface's desired state to the kernel.
    async fn apply_interface(&self, name: &str, interface: &Interface)
        -> Result<(), SystemError>;

    /// Push one static route to the kernel.
    async fn apply_route(&self, route: &Route) -> Result<(), SystemError>;

    /// Capture the current kernel state and firewall ruleset.
    async fn capture_state(&self) -> Result<KernelState, SystemError>;

    /// Restore a captured state, limited to the given scopes
    /// (`ipforward`, `interfaces`, `routes`, or `all`).
    async fn restore_state(&self, state: &Value, scopes: &[String]) -> Result<(), SystemError>;

    /// Restore a captured firewall ruleset.
    async fn restore_firewall(&self, ruleset: &str) -> Result<(), SystemError>;
}

/// A link changed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkUpdate {
    pub name: String,
    pub up: bool,
    pub mtu: u32,
}

/// An address appeared on or disappeared from a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressUpdate {
    /// Link name when the kernel reports one (IPv4 label), else empty.
    pub link: String,
    pub link_index: u32,
    pub address: String,
    pub added: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    Added,
    Deleted,
}

/// A route appeared or disappeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteUpdate {
    /// CIDR destination; `None` is the default route.
    pub destination: Option<String>,
    pub gateway: Option<String>,
    pub table: u32,
    pub action: RouteAction,
}

/// The three kernel event streams the observer consumes.
pub struct KernelEvents {
    pub links: mpsc::Receiver<LinkUpdate>,
    pub addresses: mpsc::Receiver<AddressUpdate>,
    pub routes: mpsc::Receiver<RouteUpdate>,
}

/// Source of kernel event streams.
pub trait KernelMonitor: Send + Sync {
    /// Subscribe to link, address, and route updates. The subscription ends
    /// when the returned receivers are dropped.
    fn subscribe(&self) -> Result<KernelEvents, SystemError>;
}
