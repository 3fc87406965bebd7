//! Shared CLI type definitions for the wsclient build and runtime.
//!
//! This crate provides CLI argument and configuration types used by both the
//! `build.rs` script (for man page generation) and the runtime binary.
//! Keeping them in a separate crate means the build script does not pull in
//! the networking stack.

#![expect(
    non_snake_case,
    reason = "Clap/OrthoConfig derive macros generate helper modules with uppercase names"
)]
#![expect(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]

use clap::{Args, Parser};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Endpoint used when none is configured.
pub const DEFAULT_URL: &str = "ws://localhost/";
/// Seconds allowed for the peer to finish closing.
pub const DEFAULT_CLOSE_TIMEOUT_SECS: u64 = 5;

/// Runtime configuration for the `wsclient` binary.
///
/// Values are merged from defaults, `.wsclient.toml`, `WSCLIENT_*`
/// environment variables and command-line flags, later sources winning.
#[expect(
    missing_docs,
    reason = "OrthoConfig derive macro generates items that cannot be documented"
)]
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "WSCLIENT_")]
pub struct AppConfig {
    /// Endpoint to connect to, as a `ws://` URL.
    #[ortho_config(default = DEFAULT_URL.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_URL))]
    pub url: String,
    /// Outbound masking: `zero` or `random`.
    #[ortho_config(default = "zero".to_owned())]
    #[arg(long, default_value_t = String::from("zero"))]
    pub masking: String,
    /// Opcode for outbound messages: `text` or `binary`.
    #[ortho_config(default = "text".to_owned())]
    #[arg(long, default_value_t = String::from("text"))]
    pub opcode: String,
    /// Seconds allowed for the peer to finish closing.
    #[ortho_config(default = DEFAULT_CLOSE_TIMEOUT_SECS)]
    #[arg(long, default_value_t = DEFAULT_CLOSE_TIMEOUT_SECS)]
    pub close_timeout_secs: u64,
    /// Bound on each TCP connect attempt, in seconds.
    #[arg(long)]
    pub connect_timeout_secs: Option<u64>,
    /// Bound on the upgrade handshake, in seconds.
    #[arg(long)]
    pub handshake_timeout_secs: Option<u64>,
    /// Bound on each send, in seconds.
    #[arg(long)]
    pub send_timeout_secs: Option<u64>,
    /// Largest accepted inbound message in bytes.
    #[arg(long)]
    pub max_message_size: Option<u64>,
    /// Send this message, wait for the close timeout, then exit. Without it
    /// each line read from standard input is sent.
    #[arg(long)]
    pub message: Option<String>,
}

/// Top-level CLI entry point consumed by the binary.
#[derive(Parser, Deserialize, Serialize, Debug, Clone)]
#[command(name = "wsclient", about = "Minimal WebSocket client")]
pub struct Cli {
    /// Application configuration.
    #[command(flatten)]
    pub config: AppConfig,
}
