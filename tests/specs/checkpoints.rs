// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Checkpoint and rollback specs over the socket.

use jack_adapters::SystemCall;
use jack_daemon::protocol::{Command, Request};

use super::prelude::start;

#[tokio::test]
async fn checkpoint_create_list_rollback() {
    let bed = start().await;

    let response = bed.command(Command::CheckpointCreate).await;
    assert!(response.success, "{}", response.error);
    let checkpoint_id = response
        .data
        .unwrap()
        .get("checkpoint_id")
        .unwrap()
        .as_str()
        .unwrap()
        .to_string();
    assert!(checkpoint_id.starts_with("manual-"));

    let response = bed.command(Command::CheckpointList).await;
    assert!(response.success);
    let ids: Vec<String> = response
        .data
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.get("checkpoint_id").unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![checkpoint_id.clone()]);

    // Roll back by explicit id
    let response = bed
        .request(Request {
            checkpoint_id: Some(checkpoint_id),
            ..Request::new(Command::Rollback)
        })
        .await;
    assert!(response.success, "{}", response.error);
    assert!(bed.system.calls().contains(&SystemCall::RestoreState(vec!["all".to_string()])));
}

#[tokio::test]
async fn rollback_without_checkpoints_fails() {
    let bed = start().await;
    let response = bed.command(Command::Rollback).await;
    assert!(!response.success);
    assert_eq!(response.error, "checkpoint 'latest' not found");
}

#[tokio::test]
async fn apply_creates_auto_checkpoint_and_prunes() {
    let bed = start().await;
    for _ in 0..12 {
        // Distinct checkpoint ids need distinct capture times
        bed.clock.advance(std::time::Duration::from_secs(1));
        let response = bed.command(Command::Apply).await;
        assert!(response.success, "{}", response.error);
    }
    let response = bed.command(Command::CheckpointList).await;
    let count = response.data.unwrap().as_array().unwrap().len();
    assert_eq!(count, 10, "retention keeps the ten most recent");
}
