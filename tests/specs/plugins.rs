// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Plugin supervision specs: dependency-blocked disable and apply rollback.

use std::sync::Arc;

use serde_json::json;

use jack_adapters::SystemCall;
use jack_core::Config;
use jack_daemon::protocol::{Command, Request};
use jack_plugin::{FakePlugin, Plugin};

use super::prelude::{start, TestBed};

fn register(bed: &TestBed, plugin: FakePlugin, name: &str) -> Arc<FakePlugin> {
    let namespace = plugin.metadata().namespace;
    let plugin = Arc::new(plugin);
    bed.daemon.plugins.register(Arc::clone(&plugin) as Arc<dyn Plugin>, name).unwrap();
    bed.daemon
        .services
        .register_plugin(&namespace, &plugin.metadata().provided_services)
        .unwrap();
    plugin
}

#[tokio::test]
async fn dependency_blocked_disable() {
    let bed = start().await;
    register(&bed, FakePlugin::new("mon"), "monitoring");
    register(&bed, FakePlugin::new("fw").depending_on(&["monitoring"]), "advanced-firewall");

    let response = bed
        .request(Request {
            plugin: Some("monitoring".to_string()),
            ..Request::new(Command::PluginDisable)
        })
        .await;
    assert!(!response.success);
    assert!(response.error.contains("monitoring"), "{}", response.error);
    assert!(response.error.contains("advanced-firewall"), "{}", response.error);
}

#[tokio::test]
async fn apply_failure_rolls_back_to_checkpoint() {
    let bed = start().await;
    // Interfaces committed, then a plugin that fails its apply
    assert!(bed
        .set(
            "interfaces",
            json!({ "wan": { "type": "physical", "device": "eth0", "enabled": true } }),
        )
        .await
        .success);
    assert!(bed.command(Command::Commit).await.success);

    let vpn = register(&bed, FakePlugin::new("vpn"), "vpn");
    let vpn_config = json!({ "tunnels": 2 });
    bed.daemon.store.load_committed("vpn", Config::Generic(vpn_config.clone()));
    bed.daemon.store.set_last_applied("vpn", Config::Generic(vpn_config.clone()));

    let failing = register(&bed, FakePlugin::new("x"), "x-plugin");
    bed.daemon.store.load_committed("x", Config::Generic(json!({ "mode": "new" })));
    failing.set_fail_apply(true);

    let response = bed.command(Command::Apply).await;
    assert!(!response.success);
    assert!(
        response.error.contains("apply failed, rolled back to checkpoint auto-"),
        "{}",
        response.error
    );

    // Interfaces were applied before the failure, then the kernel was
    // restored with full scope
    assert!(bed.system.applied_interfaces().contains(&"wan".to_string()));
    assert!(bed.system.calls().contains(&SystemCall::RestoreState(vec!["all".to_string()])));

    // The failing plugin never became last-applied; the healthy one was
    // flushed and re-applied to its last known good config
    assert!(bed.daemon.store.get_last_applied("x").is_none());
    assert!(*vpn.flush_count.lock() >= 1);
    assert_eq!(vpn.last_applied().unwrap(), vpn_config);
}

#[tokio::test]
async fn plugin_path_prefix_rewrites_get_and_set() {
    let bed = start().await;
    let metadata = jack_plugin::PluginMetadata {
        namespace: "firewall".to_string(),
        path_prefix: Some("rules".to_string()),
        ..jack_plugin::PluginMetadata::default()
    };
    register(&bed, FakePlugin::with_metadata(metadata), "advanced-firewall");
    bed.daemon.store.load_committed(
        "firewall",
        Config::Generic(json!({ "rules": { "wan": { "policy": "drop" } } })),
    );

    // The client path omits the prefix; the daemon inserts it
    let response = bed.get("firewall.wan.policy").await;
    assert_eq!(response.data.unwrap(), json!("drop"));

    assert!(bed.set("firewall.wan.policy", json!("accept")).await.success);
    let response = bed.get("firewall.wan.policy").await;
    assert_eq!(response.data.unwrap(), json!("accept"));
    // The underlying stored shape still nests under the prefix
    let raw = bed.daemon.store.get_current("firewall").unwrap().to_value();
    assert_eq!(raw.get("rules").unwrap().get("wan").unwrap().get("policy").unwrap(), "accept");
}

#[tokio::test]
async fn plugin_cli_routes_through_daemon() {
    let bed = start().await;
    register(&bed, FakePlugin::new("db"), "sqlite3");

    let response = bed
        .request(Request {
            plugin: Some("sqlite3".to_string()),
            cli_command: Some("tables".to_string()),
            cli_args: vec!["--all".to_string()],
            ..Request::new(Command::PluginCli)
        })
        .await;
    assert!(response.success, "{}", response.error);
    assert_eq!(response.data.unwrap(), json!("tables --all"));
}
