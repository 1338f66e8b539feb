// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};

use super::request::{Command, Request, Response};
use super::wire::{read_request, write_response, ProtocolError};

const TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::test]
async fn read_one_request_line() {
    let (mut client, server) = tokio::io::duplex(4096);
    client.write_all(b"{\"command\":\"status\"}\n").await.unwrap();

    let mut reader = BufReader::new(server);
    let request = read_request(&mut reader, TIMEOUT).await.unwrap();
    assert_eq!(request.command, Command::Status);
}

#[tokio::test]
async fn closed_connection_is_reported() {
    let (client, server) = tokio::io::duplex(4096);
    drop(client);
    let mut reader = BufReader::new(server);
    let err = read_request(&mut reader, TIMEOUT).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn silent_client_times_out() {
    let (_client, server) = tokio::io::duplex(4096);
    let mut reader = BufReader::new(server);
    let err = read_request(&mut reader, Duration::from_millis(20)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}

#[tokio::test]
async fn malformed_json_is_reported() {
    let (mut client, server) = tokio::io::duplex(4096);
    client.write_all(b"not json\n").await.unwrap();
    let mut reader = BufReader::new(server);
    let err = read_request(&mut reader, TIMEOUT).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Json(_)));
}

#[tokio::test]
async fn write_then_read_roundtrip() {
    let (server, client) = tokio::io::duplex(4096);
    let mut server = server;
    let response = Response::ok_message("done");
    write_response(&mut server, &response, TIMEOUT).await.unwrap();

    let mut reader = BufReader::new(client);
    let mut line = String::new();
    tokio::io::AsyncBufReadExt::read_line(&mut reader, &mut line).await.unwrap();
    let parsed: Response = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed, response);
}

#[tokio::test]
async fn requests_roundtrip_through_the_wire_shape() {
    let request = Request {
        path: Some("interfaces.wan.device".to_string()),
        value: Some(serde_json::json!("eth1")),
        ..Request::new(Command::Set)
    };
    let (mut client, server) = tokio::io::duplex(4096);
    let mut line = serde_json::to_vec(&request).unwrap();
    line.push(b'\n');
    client.write_all(&line).await.unwrap();

    let mut reader = BufReader::new(server);
    assert_eq!(read_request(&mut reader, TIMEOUT).await.unwrap(), request);
}
