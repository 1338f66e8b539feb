// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Drift observation specs: kernel events trigger rate-limited reconciles
//! through the full apply pipeline.

use std::time::Duration;

use serde_json::json;

use jack_adapters::{LinkUpdate, RouteAction, RouteUpdate, SystemCall};
use jack_daemon::protocol::Command;
use jack_store::{DaemonSettings, ObserverSettings};

use super::prelude::{start_with_settings, TestBed};

fn reconciling_settings() -> DaemonSettings {
    DaemonSettings {
        observer: ObserverSettings { auto_reconcile: true, reconcile_interval_ms: 0 },
        ..DaemonSettings::default()
    }
}

async fn seed_committed_network(bed: &TestBed) {
    let response = bed
        .set(
            "interfaces",
            json!({ "wan": { "type": "physical", "device": "eth0",
                             "enabled": true, "mtu": 1500 } }),
        )
        .await;
    assert!(response.success, "{}", response.error);
    let response = bed
        .set(
            "routes",
            json!({ "wan-out": { "name": "wan-out", "destination": "default",
                                 "gateway": "10.0.0.1", "enabled": true } }),
        )
        .await;
    assert!(response.success, "{}", response.error);
    assert!(bed.command(Command::Commit).await.success);
}

async fn wait_for_apply(bed: &TestBed) {
    for _ in 0..100 {
        if bed.system.calls().iter().any(|c| *c == SystemCall::CaptureState) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("reconcile apply never ran; calls: {:?}", bed.system.calls());
}

#[tokio::test]
async fn link_down_drift_reconciles() {
    let bed = start_with_settings(reconciling_settings()).await;
    seed_committed_network(&bed).await;

    // First drift reconciles immediately (last_reconcile starts one
    // interval in the past)
    bed.feed
        .links
        .send(LinkUpdate { name: "eth0".to_string(), up: false, mtu: 1500 })
        .await
        .unwrap();
    wait_for_apply(&bed).await;

    // The reconcile pushed the desired interface state back
    assert!(bed.system.applied_interfaces().contains(&"wan".to_string()));
}

#[tokio::test]
async fn externally_deleted_default_route_reconciles() {
    let bed = start_with_settings(reconciling_settings()).await;
    seed_committed_network(&bed).await;

    // Kernel reports the default route (no destination) deleted
    bed.feed
        .routes
        .send(RouteUpdate {
            destination: None,
            gateway: Some("10.0.0.1".to_string()),
            table: 0,
            action: RouteAction::Deleted,
        })
        .await
        .unwrap();
    wait_for_apply(&bed).await;
    assert!(bed.system.calls().contains(&SystemCall::ApplyRoute("wan-out".to_string())));
}

#[tokio::test]
async fn disabled_auto_reconcile_leaves_drift_alone() {
    let bed = start_with_settings(DaemonSettings::default()).await;
    seed_committed_network(&bed).await;

    bed.feed
        .links
        .send(LinkUpdate { name: "eth0".to_string(), up: false, mtu: 1500 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(bed.system.calls().is_empty(), "no apply may run: {:?}", bed.system.calls());
}

#[tokio::test]
async fn own_changes_are_debounced() {
    let bed = start_with_settings(reconciling_settings()).await;
    seed_committed_network(&bed).await;

    bed.daemon.observer.mark_change();
    bed.feed
        .links
        .send(LinkUpdate { name: "eth0".to_string(), up: false, mtu: 1500 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(bed.system.calls().is_empty(), "debounced event must not apply");
}
