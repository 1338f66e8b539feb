// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Fake adapters for tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use jack_core::{Interface, Route};

use crate::error::SystemError;
use crate::system::{
    AddressUpdate, KernelEvents, KernelMonitor, KernelState, LinkUpdate, RouteUpdate,
    SystemAdapter,
};

/// One recorded call against the fake system.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemCall {
    EnableIpForwarding,
    ApplyInterface(String),
    ApplyRoute(String),
    CaptureState,
    RestoreState(Vec<String>),
    RestoreFirewall,
}

/// Records every kernel write; individual operations can be made to fail.
#[derive(Default)]
pub struct FakeSystem {
    pub calls: Mutex<Vec<SystemCall>>,
    pub fail_interface: Mutex<Option<String>>,
    pub fail_capture: Mutex<bool>,
    pub fail_routes: Mutex<bool>,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `apply_interface` fail for the named interface.
    pub fn fail_interface(&self, name: &str) {
        *self.fail_interface.lock() = Some(name.to_string());
    }

    pub fn fail_capture(&self) {
        *self.fail_capture.lock() = true;
    }

    pub fn fail_routes(&self) {
        *self.fail_routes.lock() = true;
    }

    pub fn calls(&self) -> Vec<SystemCall> {
        self.calls.lock().clone()
    }

    /// Interface names applied, in order.
    pub fn applied_interfaces(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SystemCall::ApplyInterface(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl SystemAdapter for FakeSystem {
    async fn enable_ip_forwarding(&self) -> Result<(), SystemError> {
        self.calls.lock().push(SystemCall::EnableIpForwarding);
        Ok(())
    }

    async fn apply_interface(
        &self,
        name: &str,
        _interface: &Interface,
    ) -> Result<(), SystemError> {
        if self.fail_interface.lock().as_deref() == Some(name) {
            return Err(SystemError::Command {
                command: format!("apply {name}"),
                stderr: "injected failure".to_string(),
            });
        }
        self.calls.lock().push(SystemCall::ApplyInterface(name.to_string()));
        Ok(())
    }

    async fn apply_route(&self, route: &Route) -> Result<(), SystemError> {
        if *self.fail_routes.lock() {
            return Err(SystemError::Command {
                command: format!("route {}", route.name),
                stderr: "injected failure".to_string(),
            });
        }
        self.calls.lock().push(SystemCall::ApplyRoute(route.name.clone()));
        Ok(())
    }

    async fn capture_state(&self) -> Result<KernelState, SystemError> {
        if *self.fail_capture.lock() {
            return Err(SystemError::Command {
                command: "capture".to_string(),
                stderr: "injected failure".to_string(),
            });
        }
        self.calls.lock().push(SystemCall::CaptureState);
        Ok(KernelState { state: json!({ "fake": true }), firewall_rules: String::new() })
    }

    async fn restore_state(
        &self,
        _state: &Value,
        scopes: &[String],
    ) -> Result<(), SystemError> {
        self.calls.lock().push(SystemCall::RestoreState(scopes.to_vec()));
        Ok(())
    }

    async fn restore_firewall(&self, _ruleset: &str) -> Result<(), SystemError> {
        self.calls.lock().push(SystemCall::RestoreFirewall);
        Ok(())
    }
}

/// Sender halves used by tests to inject kernel events.
pub struct KernelFeed {
    pub links: mpsc::Sender<LinkUpdate>,
    pub addresses: mpsc::Sender<AddressUpdate>,
    pub routes: mpsc::Sender<RouteUpdate>,
}

/// A monitor fed by the test instead of the kernel.
pub struct FakeMonitor {
    events: Mutex<Option<KernelEvents>>,
}

impl FakeMonitor {
    /// The feed half and the monitor to hand to the daemon.
    pub fn channel() -> (KernelFeed, Arc<FakeMonitor>) {
        let (link_tx, links) = mpsc::channel(16);
        let (addr_tx, addresses) = mpsc::channel(16);
        let (route_tx, routes) = mpsc::channel(16);
        let feed = KernelFeed { links: link_tx, addresses: addr_tx, routes: route_tx };
        let monitor = Arc::new(FakeMonitor {
            events: Mutex::new(Some(KernelEvents { links, addresses, routes })),
        });
        (feed, monitor)
    }
}

impl KernelMonitor for FakeMonitor {
    fn subscribe(&self) -> Result<KernelEvents, SystemError> {
        self.events
            .lock()
            .take()
            .ok_or_else(|| SystemError::Netlink("fake monitor already subscribed".to_string()))
    }
}
