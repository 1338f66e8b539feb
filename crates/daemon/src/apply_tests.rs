// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use jack_adapters::SystemCall;
use jack_core::{Config, Interface, Route};
use jack_plugin::{FakePlugin, Plugin};

use super::{handle_apply, handle_checkpoint_create, handle_checkpoint_list, handle_rollback};
use crate::listener::test_fixtures::{test_daemon, TestDaemon};

fn iface(kind: &str, device: &str) -> Interface {
    Interface {
        kind: kind.to_string(),
        device: device.to_string(),
        enabled: true,
        ..Interface::default()
    }
}

fn seed_network(fixture: &TestDaemon) {
    let mut interfaces = BTreeMap::new();
    interfaces.insert("wan".to_string(), iface("physical", "eth0"));
    interfaces.insert("br0".to_string(), iface("bridge", "br0"));
    fixture.daemon.store.load_committed("interfaces", Config::Interfaces(interfaces));

    let mut routes = BTreeMap::new();
    let mut route = Route::named("wan-out");
    route.destination = "default".to_string();
    route.gateway = "10.0.0.1".to_string();
    route.enabled = true;
    routes.insert("wan-out".to_string(), route);
    fixture.daemon.store.load_committed("routes", Config::Routes(routes));
}

/// Register a fake plugin and make its namespace committed.
fn add_plugin(fixture: &TestDaemon, plugin: FakePlugin, name: &str) -> Arc<FakePlugin> {
    let namespace = plugin.metadata().namespace;
    let plugin = Arc::new(plugin);
    fixture
        .daemon
        .plugins
        .register(Arc::clone(&plugin) as Arc<dyn Plugin>, name)
        .expect("register");
    fixture
        .daemon
        .services
        .register_plugin(&namespace, &plugin.metadata().provided_services)
        .expect("services");
    plugin
}

// ── success path ─────────────────────────────────────────────────────────

#[tokio::test]
async fn apply_runs_steps_in_order() {
    let fixture = test_daemon();
    seed_network(&fixture);
    let cancel = CancellationToken::new();

    let response = handle_apply(&fixture.daemon, &cancel).await;
    assert!(response.success, "{}", response.error);

    let calls = fixture.system.calls();
    assert_eq!(calls[0], SystemCall::CaptureState);
    assert_eq!(calls[1], SystemCall::EnableIpForwarding);
    // physical before bridge
    assert_eq!(calls[2], SystemCall::ApplyInterface("wan".to_string()));
    assert_eq!(calls[3], SystemCall::ApplyInterface("br0".to_string()));
    assert_eq!(calls[4], SystemCall::ApplyRoute("wan-out".to_string()));

    // last-applied recorded for both core namespaces
    assert!(fixture.daemon.store.get_last_applied("interfaces").is_some());
    assert!(fixture.daemon.store.get_last_applied("routes").is_some());

    // the checkpoint was persisted
    assert_eq!(fixture.daemon.snapshots.list_snapshots().len(), 1);
}

#[tokio::test]
async fn apply_marks_plugin_services_ready() {
    let fixture = test_daemon();
    let plugin = add_plugin(
        &fixture,
        FakePlugin::new("db").providing(&["database"]),
        "sqlite3",
    );
    fixture
        .daemon
        .store
        .load_committed("db", Config::Generic(json!({ "path": "/tmp/db" })));
    let cancel = CancellationToken::new();

    let response = handle_apply(&fixture.daemon, &cancel).await;
    assert!(response.success, "{}", response.error);
    assert!(fixture.daemon.services.is_service_ready("database"));
    assert_eq!(plugin.last_applied().unwrap(), json!({ "path": "/tmp/db" }));
}

#[tokio::test]
async fn unchanged_plugin_config_is_skipped() {
    let fixture = test_daemon();
    let plugin = add_plugin(&fixture, FakePlugin::new("db"), "sqlite3");
    let config = json!({ "path": "/tmp/db" });
    fixture.daemon.store.load_committed("db", Config::Generic(config.clone()));
    fixture.daemon.store.set_last_applied("db", Config::Generic(config));
    let cancel = CancellationToken::new();

    let response = handle_apply(&fixture.daemon, &cancel).await;
    assert!(response.success);
    assert!(plugin.applied.lock().is_empty(), "unchanged config must not re-apply");
}

#[tokio::test]
async fn warnings_are_collected_from_status() {
    let fixture = test_daemon();
    let plugin = add_plugin(&fixture, FakePlugin::new("db"), "sqlite3");
    plugin.set_status(json!({ "warnings": ["disk nearly full"] }));
    fixture.daemon.store.load_committed("db", Config::Generic(json!({})));
    let cancel = CancellationToken::new();

    let response = handle_apply(&fixture.daemon, &cancel).await;
    assert!(response.success);
    assert!(response.message.contains("1 warning(s)"), "{}", response.message);
    let warnings = response.data.unwrap();
    assert_eq!(warnings.get("warnings").unwrap(), &json!(["db: disk nearly full"]));
}

// ── failure and rollback ─────────────────────────────────────────────────

#[tokio::test]
async fn interface_failure_rolls_back_touched_scopes() {
    let fixture = test_daemon();
    seed_network(&fixture);
    fixture.system.fail_interface("br0");
    let cancel = CancellationToken::new();

    let response = handle_apply(&fixture.daemon, &cancel).await;
    assert!(!response.success);
    assert!(response.error.contains("apply failed, rolled back to checkpoint auto-"));
    assert!(response.error.contains("br0"), "{}", response.error);

    // Restore scoped to the tags recorded so far; the interfaces tag was
    // pushed before the loop, so the partial progress is covered
    let calls = fixture.system.calls();
    let restore = calls
        .iter()
        .find_map(|call| match call {
            SystemCall::RestoreState(scopes) => Some(scopes.clone()),
            _ => None,
        })
        .expect("restore must run");
    assert_eq!(restore, vec!["ipforward".to_string(), "interfaces".to_string()]);
}

#[tokio::test]
async fn plugin_failure_restores_everything_and_preserves_last_applied() {
    let fixture = test_daemon();
    seed_network(&fixture);
    let good = add_plugin(&fixture, FakePlugin::new("vpn"), "vpn");
    let bad = add_plugin(&fixture, FakePlugin::new("fw"), "firewall");
    let good_config = json!({ "tunnels": 1 });
    fixture.daemon.store.load_committed("vpn", Config::Generic(good_config.clone()));
    fixture.daemon.store.set_last_applied("vpn", Config::Generic(good_config));
    fixture.daemon.store.load_committed("fw", Config::Generic(json!({ "rules": [] })));
    bad.set_fail_apply(true);
    let cancel = CancellationToken::new();

    let response = handle_apply(&fixture.daemon, &cancel).await;
    assert!(!response.success);
    assert!(response.error.contains("rolled back to checkpoint"));

    // The failing plugin's last_applied is untouched
    assert!(fixture.daemon.store.get_last_applied("fw").is_none());
    // All plugins were flushed during rollback and the good one re-applied
    assert!(*good.flush_count.lock() >= 1);
    assert!(*bad.flush_count.lock() >= 1);
    // Kernel restore used the full scope
    let calls = fixture.system.calls();
    assert!(calls.contains(&SystemCall::RestoreState(vec!["all".to_string()])));
}

#[tokio::test]
async fn route_failure_restores_everything() {
    let fixture = test_daemon();
    seed_network(&fixture);
    fixture.system.fail_routes();
    let cancel = CancellationToken::new();

    let response = handle_apply(&fixture.daemon, &cancel).await;
    assert!(!response.success);
    let calls = fixture.system.calls();
    assert!(calls.contains(&SystemCall::RestoreState(vec!["all".to_string()])));
    // routes never became last-applied
    assert!(fixture.daemon.store.get_last_applied("routes").is_none());
}

#[tokio::test]
async fn snapshot_capture_failure_aborts_before_any_write() {
    let fixture = test_daemon();
    seed_network(&fixture);
    fixture.system.fail_capture();
    let cancel = CancellationToken::new();

    let response = handle_apply(&fixture.daemon, &cancel).await;
    assert!(!response.success);
    assert!(response.error.contains("snapshot capture failed"));
    assert!(fixture.system.calls().is_empty());
}

// ── checkpoints ──────────────────────────────────────────────────────────

#[tokio::test]
async fn checkpoint_create_and_list() {
    let fixture = test_daemon();
    let response = handle_checkpoint_create(&fixture.daemon).await;
    assert!(response.success);
    assert!(response.message.starts_with("Created checkpoint manual-"));

    let response = handle_checkpoint_list(&fixture.daemon);
    assert!(response.success);
    assert_eq!(response.message, "1 checkpoint(s)");
    let metas = response.data.unwrap();
    assert!(metas.as_array().unwrap()[0]
        .get("checkpoint_id")
        .unwrap()
        .as_str()
        .unwrap()
        .starts_with("manual-"));
}

#[tokio::test]
async fn rollback_latest_restores_all() {
    let fixture = test_daemon();
    handle_checkpoint_create(&fixture.daemon).await;
    let cancel = CancellationToken::new();

    let response = handle_rollback(&fixture.daemon, None, &cancel).await;
    assert!(response.success, "{}", response.error);
    let calls = fixture.system.calls();
    assert!(calls.contains(&SystemCall::RestoreState(vec!["all".to_string()])));
}

#[tokio::test]
async fn rollback_unknown_checkpoint_fails() {
    let fixture = test_daemon();
    let cancel = CancellationToken::new();
    let response = handle_rollback(&fixture.daemon, Some("auto-999"), &cancel).await;
    assert!(!response.success);
    assert_eq!(response.error, "checkpoint 'auto-999' not found");
}
