// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Shared fixture: a daemon wired to fakes and temp directories.

use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::mpsc;

use jack_adapters::{FakeSystem, SystemAdapter};
use jack_core::{Clock, FakeClock};
use jack_plugin::PluginLoader;
use jack_store::{ConfigDir, DaemonSettings, SnapshotStore};

use crate::daemon::{Daemon, DaemonParts};
use crate::logs::LogBroadcaster;

pub(crate) struct TestDaemon {
    pub daemon: Arc<Daemon>,
    pub system: Arc<FakeSystem>,
    pub clock: Arc<FakeClock>,
    pub reconcile_rx: mpsc::Receiver<()>,
    // Held for the lifetime of the fixture
    #[allow(dead_code)]
    pub config_tmp: TempDir,
    #[allow(dead_code)]
    pub state_tmp: TempDir,
}

pub(crate) fn test_daemon() -> TestDaemon {
    test_daemon_with_settings(DaemonSettings::default())
}

pub(crate) fn test_daemon_with_settings(settings: DaemonSettings) -> TestDaemon {
    let config_tmp = tempfile::tempdir().expect("tempdir");
    let state_tmp = tempfile::tempdir().expect("tempdir");
    let system = Arc::new(FakeSystem::new());
    let clock = Arc::new(FakeClock::new());

    let (daemon, reconcile_rx) = Daemon::new(DaemonParts {
        snapshots: SnapshotStore::new(state_tmp.path().join("snapshots")),
        config_dir: ConfigDir::new(config_tmp.path().to_path_buf()),
        loader: PluginLoader::new(Vec::new()),
        system: Arc::clone(&system) as Arc<dyn SystemAdapter>,
        clock: Arc::clone(&clock) as Arc<dyn Clock>,
        settings,
        logs: LogBroadcaster::new(),
    });

    TestDaemon { daemon, system, clock, reconcile_rx, config_tmp, state_tmp }
}
