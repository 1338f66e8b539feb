// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jack-plugin: out-of-process plugin supervision.
//!
//! Plugins are separate executables speaking line-delimited JSON-RPC over
//! stdio. The daemon spawns them, proxies the plugin capability set, routes
//! cross-plugin service calls, and tears them down gracefully.

pub mod error;
pub mod loader;
pub mod metadata;
pub mod plugin;
pub mod proxy;
pub mod registry;
pub mod rpc;
pub mod sdk;
pub mod service;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::PluginError;
pub use loader::{check_dependencies, order_plugins_by_dependencies, PluginLoader};
pub use metadata::{CliCommand, PluginMetadata, ServiceDescriptor};
pub use plugin::Plugin;
pub use proxy::PluginHandle;
pub use registry::PluginRegistry;
pub use rpc::{Frame, RpcHandler, RpcPeer};
pub use sdk::{serve_stdio, DaemonClient, PluginRuntime, PluginService};
pub use service::{ServiceInfo, ServiceRegistry};

#[cfg(any(test, feature = "test-support"))]
pub use test_support::FakePlugin;
