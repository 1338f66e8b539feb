// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use std::sync::Arc;

use super::PluginRegistry;
use crate::error::PluginError;
use crate::metadata::PluginMetadata;
use crate::test_support::FakePlugin;

fn fake(namespace: &str) -> Arc<FakePlugin> {
    Arc::new(FakePlugin::new(namespace))
}

#[test]
fn register_and_lookup() {
    let registry = PluginRegistry::new();
    registry.register(fake("fw"), "firewall").unwrap();

    assert!(registry.is_registered("fw"));
    assert!(registry.get("fw").is_some());
    assert_eq!(registry.get_namespace_for_plugin("firewall").as_deref(), Some("fw"));
    assert_eq!(registry.get_plugin_name_for_namespace("fw").as_deref(), Some("firewall"));
    assert_eq!(registry.list(), vec![("fw".to_string(), "firewall".to_string())]);
}

#[test]
fn duplicate_namespace_rejected() {
    let registry = PluginRegistry::new();
    registry.register(fake("fw"), "firewall").unwrap();
    let err = registry.register(fake("fw"), "firewall2").unwrap_err();
    assert!(matches!(err, PluginError::DuplicateNamespace(ns) if ns == "fw"));
}

#[test]
fn unregister_removes_reverse_mapping() {
    let registry = PluginRegistry::new();
    registry.register(fake("fw"), "firewall").unwrap();
    assert!(registry.unregister("fw").is_some());

    assert!(!registry.is_registered("fw"));
    assert!(registry.get_namespace_for_plugin("firewall").is_none());
    // Second unregister is a no-op
    assert!(registry.unregister("fw").is_none());
}

#[test]
fn path_prefix_from_metadata() {
    let registry = PluginRegistry::new();
    let metadata = PluginMetadata {
        namespace: "fw".to_string(),
        path_prefix: Some("rules".to_string()),
        ..PluginMetadata::default()
    };
    registry.register(Arc::new(FakePlugin::with_metadata(metadata)), "firewall").unwrap();

    assert_eq!(registry.get_path_prefix("fw").as_deref(), Some("rules"));
    registry.unregister("fw");
    assert!(registry.get_path_prefix("fw").is_none());
}

#[test]
fn list_by_category_filters() {
    let registry = PluginRegistry::new();
    let mut net = PluginMetadata { namespace: "vpn".to_string(), ..Default::default() };
    net.category = "network".to_string();
    registry.register(Arc::new(FakePlugin::with_metadata(net)), "vpn").unwrap();
    registry.register(fake("db"), "sqlite3").unwrap();

    assert_eq!(registry.list_by_category("network"), vec!["vpn"]);
    assert!(registry.list_by_category("storage").is_empty());
}

#[tokio::test]
async fn close_all_closes_and_clears() {
    let registry = PluginRegistry::new();
    let plugin = fake("fw");
    registry.register(Arc::clone(&plugin) as Arc<dyn crate::Plugin>, "firewall").unwrap();

    registry.close_all().await;
    assert!(plugin.is_closed());
    assert!(!registry.is_registered("fw"));
}
