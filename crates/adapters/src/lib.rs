// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jack-adapters: the boundary to the kernel.
//!
//! The daemon core talks to the system through [`SystemAdapter`] (writes and
//! snapshots) and [`KernelMonitor`] (netlink event streams). Production uses
//! `LinuxSystem` and `NetlinkMonitor`; tests use the fakes.

mod error;
mod linux;
mod netlink;
mod system;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use error::SystemError;
pub use linux::LinuxSystem;
pub use netlink::NetlinkMonitor;
pub use system::{
    AddressUpdate, KernelEvents, KernelMonitor, KernelState, LinkUpdate, RouteAction,
    RouteUpdate, SystemAdapter,
};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMonitor, FakeSystem, KernelFeed, SystemCall};
