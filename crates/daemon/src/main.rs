// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! jackd: the jack supervisor daemon binary.

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use jack_adapters::{LinuxSystem, NetlinkMonitor};
use jack_core::SystemClock;
use jack_daemon::lifecycle::{self, shutdown, startup, Config};
use jack_daemon::listener::Listener;
use jack_daemon::logs::{BroadcastLayer, LogBroadcaster};

fn main() {
    let config = Config::load();
    let logs = LogBroadcaster::new();
    let _guard = init_tracing(&config, logs.clone());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("jackd: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(run(&config, logs)) {
        error!("jackd: {e}");
        eprintln!("jackd: {e}");
        std::process::exit(1);
    }
}

async fn run(
    config: &Config,
    logs: LogBroadcaster,
) -> Result<(), lifecycle::LifecycleError> {
    let system = Arc::new(LinuxSystem::new());
    let monitor = NetlinkMonitor::new();
    let clock = Arc::new(SystemClock);

    let result = startup(config, system, &monitor, clock, logs).await?;
    let daemon = Arc::clone(&result.daemon);
    tokio::spawn(Listener::new(result.listener, Arc::clone(&daemon)).run());
    info!(socket = %config.socket_path.display(), "jackd ready");

    wait_for_signal().await?;
    shutdown(&daemon, config).await;
    Ok(())
}

async fn wait_for_signal() -> std::io::Result<()> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = interrupt.recv() => info!("received SIGINT"),
        _ = terminate.recv() => info!("received SIGTERM"),
    }
    Ok(())
}

/// Log to stderr and the daemon log file, and feed the in-daemon broadcast
/// used by `logs-subscribe`.
fn init_tracing(
    config: &Config,
    logs: LogBroadcaster,
) -> tracing_appender::non_blocking::WorkerGuard {
    let _ = std::fs::create_dir_all(&config.state_dir);
    let file_appender = tracing_appender::rolling::never(
        &config.state_dir,
        config.log_path.file_name().unwrap_or_else(|| std::ffi::OsStr::new("jackd.log")),
    );
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer))
        .with(BroadcastLayer::new(logs))
        .init();
    guard
}
