//! Command-line front end.
//!
//! Loads [`AppConfig`] from defaults, `.wsclient.toml`, `WSCLIENT_*`
//! environment variables and flags, connects, and then either sends a single
//! `--message` or forwards each line of standard input. Inbound messages are
//! printed as they arrive.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
pub use cli_defs::{AppConfig, Cli};
use ortho_config::OrthoConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    client::{Client, Connection, Handler, Message},
    codec::Opcode,
    config::{ClientConfig, Masking},
    error::ClientError,
};

/// Everything needed to run one session, derived from [`AppConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPlan {
    /// Engine configuration.
    pub client: ClientConfig,
    /// Opcode used for outbound messages.
    pub opcode: Opcode,
    /// Bound on each send.
    pub send_timeout: Option<Duration>,
}

impl SessionPlan {
    /// Translate loaded configuration into engine settings.
    ///
    /// # Errors
    /// Returns an error if the URL, masking mode or opcode is invalid.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let masking: Masking = config.masking.parse().map_err(anyhow::Error::msg)?;
        let opcode = match config.opcode.as_str() {
            "text" => Opcode::Text,
            "binary" => Opcode::Binary,
            other => bail!("unknown opcode {other:?}; expected text or binary"),
        };
        let mut client = ClientConfig::from_url(&config.url)
            .with_context(|| format!("invalid endpoint {}", config.url))?
            .with_masking(masking)
            .with_close_timeout(Duration::from_secs(config.close_timeout_secs));
        if let Some(secs) = config.connect_timeout_secs {
            client = client.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.handshake_timeout_secs {
            client = client.with_handshake_timeout(Duration::from_secs(secs));
        }
        if let Some(limit) = config.max_message_size {
            client = client.with_max_message_size(limit);
        }
        Ok(Self {
            client,
            opcode,
            send_timeout: config.send_timeout_secs.map(Duration::from_secs),
        })
    }
}

/// Prints inbound messages to standard output.
#[derive(Debug, Default)]
pub struct ConsoleHandler;

#[async_trait]
impl Handler for ConsoleHandler {
    #[expect(clippy::print_stdout, reason = "the console handler writes to stdout")]
    async fn on_message(&self, _connection: &Connection, message: Message) {
        match message.as_text() {
            Some(text) if message.opcode == Opcode::Text => println!("{text}"),
            _ => println!("[{}] {} bytes", message.opcode, message.payload.len()),
        }
    }

    async fn on_disconnect(&self, _connection: &Connection, error: Option<ClientError>) {
        match error {
            Some(err) => warn!(error = %err, "disconnected"),
            None => info!("disconnected"),
        }
    }
}

/// Install the `fmt` subscriber, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        warn!("tracing subscriber already installed");
    }
}

/// Load configuration and run one session.
///
/// # Errors
/// Returns any error raised while loading configuration, connecting or
/// sending.
pub async fn run() -> Result<()> {
    init_tracing();
    let config = AppConfig::load_from_iter(std::env::args_os())?;
    run_with_config(&config).await
}

/// Run one session using already loaded configuration.
///
/// # Errors
/// Propagates connection and send failures.
pub async fn run_with_config(config: &AppConfig) -> Result<()> {
    let plan = SessionPlan::from_config(config)?;
    let endpoint = format!("{}:{}", plan.client.host, plan.client.port);
    let client = Client::connect(plan.client.clone(), ConsoleHandler)
        .await
        .with_context(|| format!("failed to connect to {endpoint}"))?;

    let outcome = match &config.message {
        Some(message) => send_once(&client, &plan, message).await,
        None => forward_stdin(&client, &plan).await,
    };
    client.close().await;
    outcome
}

async fn send_once(client: &Client, plan: &SessionPlan, message: &str) -> Result<()> {
    client
        .send(message.as_bytes(), plan.opcode, plan.send_timeout)
        .await?;
    // Give the peer a chance to answer before closing.
    tokio::select! {
        () = client.join() => {}
        () = tokio::time::sleep(plan.client.close_timeout) => {}
    }
    Ok(())
}

async fn forward_stdin(client: &Client, plan: &SessionPlan) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            () = client.join() => return Ok(()),
            line = lines.next_line() => line.context("failed to read standard input")?,
        };
        let Some(line) = line else {
            return Ok(());
        };
        client
            .send(line.as_bytes(), plan.opcode, plan.send_timeout)
            .await?;
    }
}
