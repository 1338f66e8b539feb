// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! IPC protocol for client communication.
//!
//! Wire format: one JSON object per `\n`-terminated line. A connection
//! carries one request and one response, except `logs-subscribe`, which
//! streams log entries until the client disconnects.

mod request;
mod wire;

pub use request::{Command, Request, Response};
pub use wire::{read_request, write_json_line, write_response, ProtocolError};


#[cfg(test)]
#[path = "request_tests.rs"]
mod request_tests;

#[cfg(test)]
#[path = "wire_tests.rs"]
mod wire_tests;
