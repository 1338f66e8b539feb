// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::ServiceRegistry;
use crate::error::PluginError;
use crate::metadata::ServiceDescriptor;
use crate::plugin::Plugin;
use crate::registry::PluginRegistry;
use crate::test_support::FakePlugin;

fn descriptor(name: &str) -> ServiceDescriptor {
    ServiceDescriptor { name: name.to_string(), ..Default::default() }
}

// ── registration ─────────────────────────────────────────────────────────

#[test]
fn single_provider_invariant() {
    let services = ServiceRegistry::new();
    services.register_plugin("db", &[descriptor("database")]).unwrap();

    let err = services.register_plugin("db2", &[descriptor("database")]).unwrap_err();
    assert!(matches!(
        err,
        PluginError::DuplicateService { name, provider } if name == "database" && provider == "db"
    ));
}

#[test]
fn register_is_all_or_nothing() {
    let services = ServiceRegistry::new();
    services.register_plugin("db", &[descriptor("database")]).unwrap();

    let err = services
        .register_plugin("other", &[descriptor("cache"), descriptor("database")])
        .unwrap_err();
    assert!(matches!(err, PluginError::DuplicateService { .. }));
    // The non-conflicting service must not have been claimed
    assert!(services.validate_service_dependencies("x", &["cache".to_string()]).is_err());
}

#[test]
fn unregister_frees_the_name() {
    let services = ServiceRegistry::new();
    services.register_plugin("db", &[descriptor("database")]).unwrap();
    services.mark_service_ready("database");

    services.unregister_plugin("db");
    assert!(!services.is_service_ready("database"));
    // A new provider can claim the freed name, starting not-ready
    services.register_plugin("db2", &[descriptor("database")]).unwrap();
    assert!(!services.is_service_ready("database"));
}

// ── readiness ────────────────────────────────────────────────────────────

#[test]
fn mark_ready_is_idempotent() {
    let services = ServiceRegistry::new();
    services.register_plugin("db", &[descriptor("database")]).unwrap();
    assert!(!services.is_service_ready("database"));

    assert!(services.mark_service_ready("database"));
    assert!(services.mark_service_ready("database"));
    assert!(services.is_service_ready("database"));
}

#[test]
fn are_services_ready_requires_all() {
    let services = ServiceRegistry::new();
    services.register_plugin("db", &[descriptor("database"), descriptor("kv")]).unwrap();
    services.mark_service_ready("database");
    assert!(!services.are_services_ready(&["database".to_string(), "kv".to_string()]));
    services.mark_service_ready("kv");
    assert!(services.are_services_ready(&["database".to_string(), "kv".to_string()]));
}

#[tokio::test]
async fn wait_returns_immediately_when_ready() {
    let services = ServiceRegistry::new();
    services.register_plugin("db", &[descriptor("database")]).unwrap();
    services.mark_service_ready("database");
    services.wait_for_service("database", &CancellationToken::new()).await.unwrap();
}

#[tokio::test]
async fn wait_blocks_until_provider_becomes_ready() {
    // The waiter starts before any provider is registered
    let services = Arc::new(ServiceRegistry::new());
    let waiter = {
        let services = Arc::clone(&services);
        tokio::spawn(async move {
            services.wait_for_service("database", &CancellationToken::new()).await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished(), "waiter must block with no provider");

    services.register_plugin("db", &[descriptor("database")]).unwrap();
    services.mark_service_ready("database");
    tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn wait_is_cancellable() {
    let services = ServiceRegistry::new();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = services.wait_for_service("database", &cancel).await.unwrap_err();
    assert!(matches!(err, PluginError::Cancelled));
}

#[tokio::test]
async fn unregister_unblocks_dangling_waiters() {
    let services = Arc::new(ServiceRegistry::new());
    services.register_plugin("db", &[descriptor("database")]).unwrap();

    let waiter = {
        let services = Arc::clone(&services);
        tokio::spawn(async move {
            services.wait_for_service("database", &CancellationToken::new()).await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    services.unregister_plugin("db");

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert!(matches!(result, Err(PluginError::NoProvider(_))));
}

// ── dependencies and routing ─────────────────────────────────────────────

#[test]
fn validate_dependencies_enumerates_missing() {
    let services = ServiceRegistry::new();
    services.register_plugin("db", &[descriptor("database")]).unwrap();

    services.validate_service_dependencies("consumer", &["database".to_string()]).unwrap();
    let err = services
        .validate_service_dependencies(
            "consumer",
            &["database".to_string(), "metrics".to_string()],
        )
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("consumer") && message.contains("metrics"), "{message}");
}

#[tokio::test]
async fn call_service_routes_to_provider() {
    let services = ServiceRegistry::new();
    let plugins = PluginRegistry::new();
    let provider = Arc::new(FakePlugin::new("db").providing(&["database"]));
    plugins.register(Arc::clone(&provider) as Arc<dyn crate::Plugin>, "sqlite3").unwrap();
    services.register_plugin("db", &provider.metadata().provided_services).unwrap();
    services.mark_service_ready("database");

    let result = services
        .call_service(
            &plugins,
            "database",
            "QueryRow",
            &json!({ "sql": "select 1" }),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(result, json!({ "service": "database", "method": "QueryRow" }));
    let calls = provider.service_calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "QueryRow");
}

#[tokio::test]
async fn call_service_without_provider_fails() {
    let services = ServiceRegistry::new();
    let plugins = PluginRegistry::new();
    let err = services
        .call_service(&plugins, "database", "Get", &json!({}), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PluginError::NoProvider(_)));
}

#[test]
fn list_services_skips_placeholders() {
    let services = ServiceRegistry::new();
    // A waiter-created placeholder has no provider and must not be listed;
    // simulate by registering then unregistering plus one live service.
    services.register_plugin("db", &[descriptor("database")]).unwrap();
    services.mark_service_ready("database");

    let listed = services.list_services();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "database");
    assert_eq!(listed[0].provider, "db");
    assert!(listed[0].ready);
}
