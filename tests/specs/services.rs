// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Service readiness barrier specs.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use jack_plugin::{FakePlugin, Plugin};

use super::prelude::start;

#[tokio::test]
async fn readiness_barrier_unblocks_waiters_and_routes_calls() {
    let bed = start().await;

    // A consumer waits for a service that has no provider yet
    let waiter = {
        let daemon = Arc::clone(&bed.daemon);
        tokio::spawn(async move {
            daemon.services.wait_for_service("database", &CancellationToken::new()).await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiter.is_finished(), "waiter must block while no provider exists");

    // The provider arrives and becomes ready
    let provider = Arc::new(FakePlugin::new("db").providing(&["database"]));
    bed.daemon.plugins.register(Arc::clone(&provider) as Arc<dyn Plugin>, "sqlite3").unwrap();
    bed.daemon
        .services
        .register_plugin("db", &provider.metadata().provided_services)
        .unwrap();
    bed.daemon.services.mark_service_ready("database");

    tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap().unwrap();

    // Calls route to the provider plugin
    let result = bed
        .daemon
        .services
        .call_service(
            &bed.daemon.plugins,
            "database",
            "QueryRow",
            &json!({ "sql": "select 1" }),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(result, json!({ "service": "database", "method": "QueryRow" }));
    assert_eq!(provider.service_calls.lock().len(), 1);
}

#[tokio::test]
async fn service_readiness_waits_after_apply_marks_ready() {
    let bed = start().await;
    let provider = Arc::new(FakePlugin::new("db").providing(&["database"]));
    bed.daemon.plugins.register(Arc::clone(&provider) as Arc<dyn Plugin>, "sqlite3").unwrap();
    bed.daemon
        .services
        .register_plugin("db", &provider.metadata().provided_services)
        .unwrap();
    bed.daemon
        .store
        .load_committed("db", jack_core::Config::Generic(json!({ "path": ":memory:" })));

    assert!(!bed.daemon.services.is_service_ready("database"));
    let response = bed.command(jack_daemon::protocol::Command::Apply).await;
    assert!(response.success, "{}", response.error);
    assert!(bed.daemon.services.is_service_ready("database"));
}
