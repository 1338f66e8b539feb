// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

use serde_json::json;

use super::request::{Command, Request, Response};

#[yare::parameterized(
    status            = { Command::Status,           "status" },
    plugin_enable     = { Command::PluginEnable,     "plugin-enable" },
    plugin_cli        = { Command::PluginCli,        "plugin-cli" },
    checkpoint_list   = { Command::CheckpointList,   "checkpoint-list" },
    checkpoint_create = { Command::CheckpointCreate, "checkpoint-create" },
    logs_subscribe    = { Command::LogsSubscribe,    "logs-subscribe" },
)]
fn commands_are_kebab_case(command: Command, wire: &str) {
    assert_eq!(serde_json::to_value(command).unwrap(), json!(wire));
}

#[test]
fn request_omits_empty_fields() {
    let value = serde_json::to_value(Request::new(Command::Status)).unwrap();
    assert_eq!(value, json!({ "command": "status" }));
}

#[test]
fn request_parses_from_wire_shape() {
    let request: Request = serde_json::from_str(
        r#"{"command":"set","path":"interfaces.wan.device","value":"eth1"}"#,
    )
    .unwrap();
    assert_eq!(request.command, Command::Set);
    assert_eq!(request.path.as_deref(), Some("interfaces.wan.device"));
    assert_eq!(request.value, Some(json!("eth1")));
    assert!(request.cli_args.is_empty());
}

#[test]
fn response_omits_empty_fields() {
    let value = serde_json::to_value(Response::ok()).unwrap();
    assert_eq!(value, json!({ "success": true }));

    let value = serde_json::to_value(Response::failed("boom")).unwrap();
    assert_eq!(value, json!({ "success": false, "error": "boom" }));
}

#[test]
fn response_roundtrips() {
    let response = Response::ok_message("done").with_data(json!({ "x": 1 }));
    let line = serde_json::to_string(&response).unwrap();
    let parsed: Response = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed, response);
}
