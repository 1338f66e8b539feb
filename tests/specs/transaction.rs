// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Transaction protocol specs: stage, diff, commit, revert, validate.

use serde_json::json;

use jack_daemon::protocol::Command;

use super::prelude::start;

async fn seed(bed: &super::prelude::TestBed) {
    let response = bed
        .set(
            "interfaces",
            json!({ "wan": { "type": "physical", "device": "eth0", "enabled": true } }),
        )
        .await;
    assert!(response.success, "{}", response.error);
    let response = bed.command(Command::Commit).await;
    assert!(response.success, "{}", response.error);
}

#[tokio::test]
async fn stage_and_commit_interface_change() {
    let bed = start().await;
    seed(&bed).await;

    assert!(bed.set("interfaces.wan.device", json!("eth1")).await.success);

    let diff = bed.command(Command::Diff).await;
    assert_eq!(diff.message, "1 change(s)");
    assert!(
        diff.data.unwrap().as_str().unwrap().contains(
            "~ interfaces.wan.device: \"eth0\" → \"eth1\""
        )
    );

    assert!(bed.command(Command::Commit).await.success);
    assert_eq!(bed.get("interfaces.wan.device").await.data.unwrap(), json!("eth1"));
    assert_eq!(bed.command(Command::Status).await.message, "No pending changes");
}

#[tokio::test]
async fn revert_restores_committed_state() {
    let bed = start().await;
    seed(&bed).await;
    assert!(bed.set("interfaces.wan.device", json!("eth1")).await.success);
    assert_eq!(bed.command(Command::Status).await.message, "Pending changes exist");

    assert!(bed.command(Command::Revert).await.success);
    assert_eq!(bed.command(Command::Status).await.message, "No pending changes");
    assert_eq!(bed.get("interfaces.wan.device").await.data.unwrap(), json!("eth0"));
}

#[tokio::test]
async fn validation_failure_blocks_commit_and_disk() {
    let bed = start().await;
    seed(&bed).await;
    assert!(bed.set("interfaces.wan.type", json!("bogus")).await.success);

    let response = bed.command(Command::Commit).await;
    assert!(!response.success);
    assert!(response.error.contains("wan"), "{}", response.error);

    // Disk still holds the valid committed config
    let on_disk = bed.daemon.config_dir.load("interfaces").unwrap().unwrap();
    assert_eq!(on_disk.get("wan").unwrap().get("type").unwrap(), &json!("physical"));
}

#[tokio::test]
async fn commit_and_revert_are_idempotent_when_nothing_pending() {
    let bed = start().await;
    let commit = bed.command(Command::Commit).await;
    assert!(commit.success);
    assert_eq!(commit.message, "No pending changes");
    assert!(bed.command(Command::Revert).await.success);
}
