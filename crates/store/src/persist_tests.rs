// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use serde_json::json;
use tempfile::tempdir;

use super::{ConfigDir, DaemonSettings, ObserverSettings, PluginState};

#[test]
fn load_missing_file_is_none() {
    let dir = tempdir().unwrap();
    let config_dir = ConfigDir::new(dir.path().to_path_buf());
    assert!(config_dir.load("interfaces").unwrap().is_none());
}

#[test]
fn save_then_load_roundtrip() {
    let dir = tempdir().unwrap();
    let config_dir = ConfigDir::new(dir.path().join("jack"));
    let value = json!({ "wan": { "type": "physical", "device": "eth0" } });
    config_dir.save("interfaces", &value).unwrap();
    assert_eq!(config_dir.load("interfaces").unwrap().unwrap(), value);
}

#[test]
fn save_leaves_no_temp_file() {
    let dir = tempdir().unwrap();
    let config_dir = ConfigDir::new(dir.path().to_path_buf());
    config_dir.save("routes", &json!({})).unwrap();
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["routes.json"]);
}

#[test]
fn list_returns_sorted_stems() {
    let dir = tempdir().unwrap();
    let config_dir = ConfigDir::new(dir.path().to_path_buf());
    config_dir.save("routes", &json!({})).unwrap();
    config_dir.save("interfaces", &json!({})).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    assert_eq!(config_dir.list().unwrap(), vec!["interfaces", "routes"]);
}

#[test]
fn settings_default_when_absent() {
    let dir = tempdir().unwrap();
    let config_dir = ConfigDir::new(dir.path().to_path_buf());
    let settings = DaemonSettings::load(&config_dir).unwrap();
    assert!(settings.plugins.is_empty());
    assert!(!settings.observer.auto_reconcile);
    assert_eq!(settings.observer.reconcile_interval_ms, 0);
}

#[test]
fn settings_roundtrip() {
    let dir = tempdir().unwrap();
    let config_dir = ConfigDir::new(dir.path().to_path_buf());
    let mut settings = DaemonSettings::default();
    settings
        .plugins
        .insert("firewall".to_string(), PluginState { enabled: true, version: "1.2".to_string() });
    settings.observer =
        ObserverSettings { auto_reconcile: true, reconcile_interval_ms: 5000 };
    settings.save(&config_dir).unwrap();

    let loaded = DaemonSettings::load(&config_dir).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn settings_tolerate_partial_file() {
    let dir = tempdir().unwrap();
    let config_dir = ConfigDir::new(dir.path().to_path_buf());
    config_dir.save("jack", &json!({ "plugins": { "vpn": { "enabled": false } } })).unwrap();
    let loaded = DaemonSettings::load(&config_dir).unwrap();
    assert!(!loaded.plugins.get("vpn").unwrap().enabled);
    assert_eq!(loaded.observer, ObserverSettings::default());
}
