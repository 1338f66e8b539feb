// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Spec fixture: a full daemon on a real Unix socket, with fake kernel and
//! plugin boundaries.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;

use jack_adapters::{FakeMonitor, FakeSystem, KernelFeed, KernelMonitor, SystemAdapter};
use jack_core::{Clock, FakeClock};
use jack_daemon::daemon::{Daemon, DaemonParts};
use jack_daemon::listener::Listener;
use jack_daemon::logs::LogBroadcaster;
use jack_daemon::protocol::{Command, Request, Response};
use jack_plugin::PluginLoader;
use jack_store::{ConfigDir, DaemonSettings, SnapshotStore};

pub struct TestBed {
    pub daemon: Arc<Daemon>,
    pub system: Arc<FakeSystem>,
    pub clock: Arc<FakeClock>,
    pub feed: KernelFeed,
    pub socket: PathBuf,
    // Holds the config, snapshot, and socket paths alive
    #[allow(dead_code)]
    tmp: TempDir,
}

pub async fn start() -> TestBed {
    start_with_settings(DaemonSettings::default()).await
}

pub async fn start_with_settings(settings: DaemonSettings) -> TestBed {
    let tmp = tempfile::tempdir().expect("tempdir");
    let system = Arc::new(FakeSystem::new());
    let clock = Arc::new(FakeClock::new());

    let (daemon, mut reconcile_rx) = Daemon::new(DaemonParts {
        snapshots: SnapshotStore::new(tmp.path().join("snapshots")),
        config_dir: ConfigDir::new(tmp.path().join("config")),
        loader: PluginLoader::new(Vec::new()),
        system: Arc::clone(&system) as Arc<dyn SystemAdapter>,
        clock: Arc::clone(&clock) as Arc<dyn Clock>,
        settings,
        logs: LogBroadcaster::new(),
    });

    // Observer loop fed by the test, and the reconcile task it enqueues to
    let (feed, monitor) = FakeMonitor::channel();
    let events = monitor.subscribe().expect("subscribe");
    {
        let daemon = Arc::clone(&daemon);
        tokio::spawn(async move {
            let store = Arc::clone(&daemon.store);
            daemon.observer.run(events, store).await;
        });
    }
    {
        let daemon = Arc::clone(&daemon);
        tokio::spawn(async move {
            while reconcile_rx.recv().await.is_some() {
                let _ =
                    jack_daemon::apply::handle_apply(&daemon, &CancellationToken::new()).await;
            }
        });
    }

    let socket = tmp.path().join("jack.sock");
    let listener = UnixListener::bind(&socket).expect("bind");
    tokio::spawn(Listener::new(listener, Arc::clone(&daemon)).run());

    TestBed { daemon, system, clock, feed, socket, tmp }
}

impl TestBed {
    /// One request/response exchange over the socket.
    pub async fn request(&self, request: Request) -> Response {
        let stream = UnixStream::connect(&self.socket).await.expect("connect");
        let (read_half, mut write_half) = stream.into_split();
        let mut line = serde_json::to_vec(&request).expect("serialize");
        line.push(b'\n');
        write_half.write_all(&line).await.expect("write");

        let mut reader = BufReader::new(read_half);
        let mut response_line = String::new();
        reader.read_line(&mut response_line).await.expect("read");
        serde_json::from_str(&response_line).expect("parse response")
    }

    pub async fn command(&self, command: Command) -> Response {
        self.request(Request::new(command)).await
    }

    pub async fn set(&self, path: &str, value: serde_json::Value) -> Response {
        self.request(Request {
            path: Some(path.to_string()),
            value: Some(value),
            ..Request::new(Command::Set)
        })
        .await
    }

    pub async fn get(&self, path: &str) -> Response {
        self.request(Request { path: Some(path.to_string()), ..Request::new(Command::Get) })
            .await
    }
}
