// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jack-store: the two-layer state store, snapshot registry, and on-disk
//! persistence for the jack daemon.

mod error;
mod persist;
mod snapshot;
mod state;

pub use error::StoreError;
pub use persist::{ConfigDir, DaemonSettings, ObserverSettings, PluginState};
pub use snapshot::{Snapshot, SnapshotMeta, SnapshotStore, SNAPSHOT_RETENTION};
pub use state::StateStore;
