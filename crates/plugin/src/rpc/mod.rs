// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! Bidirectional JSON-RPC over a byte stream.
//!
//! Wire format: one JSON frame per `\n` line. Requests carry `id`, `method`,
//! `params`; responses carry `id` and `result` or `error`. Both sides of the
//! transport may originate requests; ids correlate responses so concurrent
//! calls in either direction never block each other.

mod frame;
mod peer;

pub use frame::Frame;
pub use peer::{NullHandler, RpcHandler, RpcPeer};

#[cfg(test)]
#[path = "peer_tests.rs"]
mod tests;
