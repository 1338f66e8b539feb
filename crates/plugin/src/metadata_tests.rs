// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use serde_json::json;

use super::PluginMetadata;

#[test]
fn minimal_metadata_fills_defaults() {
    let metadata: PluginMetadata =
        serde_json::from_value(json!({ "namespace": "fw", "version": "1.0" })).unwrap();
    assert_eq!(metadata.namespace, "fw");
    assert!(metadata.dependencies.is_empty());
    assert!(metadata.path_prefix.is_none());
    assert!(metadata.default_config.is_none());
}

#[test]
fn full_metadata_roundtrips() {
    let metadata: PluginMetadata = serde_json::from_value(json!({
        "namespace": "fw",
        "version": "2.1",
        "description": "packet filter",
        "category": "network",
        "dependencies": ["monitoring"],
        "path_prefix": "rules",
        "provided_services": [
            { "name": "firewall", "description": "rule management", "methods": ["AddRule"] }
        ],
        "required_services": ["database"],
        "cli_commands": [{ "name": "show", "description": "", "usage": "show" }],
        "default_config": { "policy": "drop" },
    }))
    .unwrap();
    assert_eq!(metadata.provided_services[0].name, "firewall");
    assert_eq!(metadata.required_services, vec!["database"]);

    let value = serde_json::to_value(&metadata).unwrap();
    let parsed: PluginMetadata = serde_json::from_value(value).unwrap();
    assert_eq!(parsed, metadata);
}

#[yare::parameterized(
    no_prefix    = { json!({ "namespace": "a" }),                        None },
    with_prefix  = { json!({ "namespace": "a", "path_prefix": "p" }),    Some("p") },
)]
fn path_prefix_parses(value: serde_json::Value, expected: Option<&str>) {
    let metadata: PluginMetadata = serde_json::from_value(value).unwrap();
    assert_eq!(metadata.path_prefix.as_deref(), expected);
}
