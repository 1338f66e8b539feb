// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The jack authors

//! jack: thin client for the jackd supervisor daemon.
//!
//! Marshals one request line over the Unix socket, prints the response.
//! No business logic lives here.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use jack_daemon::protocol::{Command, Request, Response};

#[derive(Parser)]
#[command(name = "jack", about = "Control the jack network configuration daemon")]
struct Cli {
    /// Daemon socket path
    #[arg(long, env = "JACK_SOCKET_PATH", default_value = "/var/run/jack.sock")]
    socket: PathBuf,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Whether pending changes exist
    Status,
    /// Aggregated daemon and plugin status
    Info,
    /// Show staged changes
    Diff,
    /// Validate and commit staged changes
    Commit,
    /// Discard staged changes
    Revert,
    /// Apply committed configuration to the system
    Apply,
    /// Show current configuration
    Show { path: Option<String> },
    /// Read a config value by dotted path
    Get { path: Option<String> },
    /// Stage a config value by dotted path
    Set { path: String, value: String },
    /// Type-check a value without staging it
    Validate { path: String, value: String },
    /// Manage plugins
    #[command(subcommand)]
    Plugin(PluginCmd),
    /// Roll back to a checkpoint
    Rollback { checkpoint_id: Option<String> },
    /// Manage checkpoints
    #[command(subcommand)]
    Checkpoint(CheckpointCmd),
    /// Stream daemon logs
    Logs {
        /// Minimum level (trace, debug, info, warn, error)
        #[arg(long)]
        filter: Option<String>,
    },
}

#[derive(Subcommand)]
enum PluginCmd {
    Enable { name: String },
    Disable { name: String },
    Rescan,
    /// Run a plugin CLI command
    Cli {
        name: String,
        command: String,
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum CheckpointCmd {
    List,
    Create,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Cmd::Logs { filter } = &cli.command {
        return stream_logs(&cli.socket, filter.as_deref()).await;
    }

    let request = build_request(&cli.command);
    let response = send(&cli.socket, &request).await?;
    print_response(&response)
}

fn build_request(command: &Cmd) -> Request {
    match command {
        Cmd::Status => Request::new(Command::Status),
        Cmd::Info => Request::new(Command::Info),
        Cmd::Diff => Request::new(Command::Diff),
        Cmd::Commit => Request::new(Command::Commit),
        Cmd::Revert => Request::new(Command::Revert),
        Cmd::Apply => Request::new(Command::Apply),
        Cmd::Show { path } => {
            Request { path: path.clone(), ..Request::new(Command::Show) }
        }
        Cmd::Get { path } => Request { path: path.clone(), ..Request::new(Command::Get) },
        Cmd::Set { path, value } => Request {
            path: Some(path.clone()),
            value: Some(parse_value(value)),
            ..Request::new(Command::Set)
        },
        Cmd::Validate { path, value } => Request {
            path: Some(path.clone()),
            value: Some(parse_value(value)),
            ..Request::new(Command::Validate)
        },
        Cmd::Plugin(PluginCmd::Enable { name }) => {
            Request { plugin: Some(name.clone()), ..Request::new(Command::PluginEnable) }
        }
        Cmd::Plugin(PluginCmd::Disable { name }) => {
            Request { plugin: Some(name.clone()), ..Request::new(Command::PluginDisable) }
        }
        Cmd::Plugin(PluginCmd::Rescan) => Request::new(Command::PluginRescan),
        Cmd::Plugin(PluginCmd::Cli { name, command, args }) => Request {
            plugin: Some(name.clone()),
            cli_command: Some(command.clone()),
            cli_args: args.clone(),
            ..Request::new(Command::PluginCli)
        },
        Cmd::Rollback { checkpoint_id } => Request {
            checkpoint_id: checkpoint_id.clone(),
            ..Request::new(Command::Rollback)
        },
        Cmd::Checkpoint(CheckpointCmd::List) => Request::new(Command::CheckpointList),
        Cmd::Checkpoint(CheckpointCmd::Create) => Request::new(Command::CheckpointCreate),
        Cmd::Logs { .. } => Request::new(Command::LogsSubscribe),
    }
}

/// Values are JSON when they parse as JSON, otherwise plain strings, so
/// `jack set interfaces.wan.device eth1` works without quoting.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn send(socket: &PathBuf, request: &Request) -> Result<Response> {
    let stream = UnixStream::connect(socket)
        .await
        .with_context(|| format!("is jackd running? (socket {})", socket.display()))?;
    let (read_half, mut write_half) = stream.into_split();

    let mut line = serde_json::to_vec(request)?;
    line.push(b'\n');
    write_half.write_all(&line).await?;

    let mut reader = BufReader::new(read_half);
    let mut response_line = String::new();
    reader.read_line(&mut response_line).await?;
    if response_line.is_empty() {
        bail!("daemon closed the connection");
    }
    Ok(serde_json::from_str(&response_line)?)
}

fn print_response(response: &Response) -> Result<()> {
    if !response.success {
        bail!("{}", response.error);
    }
    if !response.message.is_empty() {
        println!("{}", response.message);
    }
    if let Some(data) = &response.data {
        match data {
            Value::String(text) => println!("{text}"),
            other => println!("{}", serde_json::to_string_pretty(other)?),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        bare_string = { "eth1",          Value::String("eth1".to_string()) },
        number      = { "1500",          serde_json::json!(1500) },
        boolean     = { "true",          serde_json::json!(true) },
        object      = { r#"{"a": 1}"#,   serde_json::json!({ "a": 1 }) },
        quoted      = { r#""eth1""#,     Value::String("eth1".to_string()) },
    )]
    fn values_parse_as_json_or_string(raw: &str, expected: Value) {
        assert_eq!(parse_value(raw), expected);
    }

    #[test]
    fn set_builds_wire_request() {
        let cmd = Cmd::Set { path: "interfaces.wan.mtu".to_string(), value: "1500".to_string() };
        let request = build_request(&cmd);
        assert_eq!(request.command, Command::Set);
        assert_eq!(request.value, Some(serde_json::json!(1500)));
    }
}

/// Stream log lines until the daemon or the user ends the session.
async fn stream_logs(socket: &PathBuf, filter: Option<&str>) -> Result<()> {
    let request =
        Request { log_filter: filter.map(str::to_string), ..Request::new(Command::LogsSubscribe) };
    let stream = UnixStream::connect(socket)
        .await
        .with_context(|| format!("is jackd running? (socket {})", socket.display()))?;
    let (read_half, mut write_half) = stream.into_split();

    let mut line = serde_json::to_vec(&request)?;
    line.push(b'\n');
    write_half.write_all(&line).await?;

    let mut reader = BufReader::new(read_half);
    let mut entry_line = String::new();
    loop {
        entry_line.clear();
        let read = reader.read_line(&mut entry_line).await?;
        if read == 0 {
            return Ok(());
        }
        match serde_json::from_str::<Value>(&entry_line) {
            Ok(entry) => {
                let level = entry.get("level").and_then(Value::as_str).unwrap_or("INFO");
                let target = entry.get("target").and_then(Value::as_str).unwrap_or("");
                let message = entry.get("message").and_then(Value::as_str).unwrap_or("");
                println!("{level:5} {target}: {message}");
            }
            Err(_) => print!("{entry_line}"),
        }
    }
}
