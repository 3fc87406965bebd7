//! Minimal WebSocket client engine.
//!
//! The crate speaks the client side of RFC 6455 over plain TCP: it performs
//! the HTTP upgrade (answering NTLM or Negotiate challenges through a
//! pluggable [`auth::SecurityProvider`]), sends unfragmented masked frames,
//! and runs one background task per connection that reassembles fragments,
//! answers pings and hands complete messages to a [`Handler`].
//!
//! ```no_run
//! use async_trait::async_trait;
//! use wsclient::{Client, ClientConfig, Connection, Handler, Message};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Handler for Echo {
//!     async fn on_message(&self, connection: &Connection, message: Message) {
//!         let _ = connection.send_binary(&message.payload).await;
//!     }
//! }
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_url("ws://localhost:9000/echo")?;
//! let client = Client::connect(config, Echo).await?;
//! client.send_text("hello").await?;
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cli;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod handshake;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use client::{Client, ClientBuilder, Connection, Handler, Message, PeerIdentity};
pub use codec::Opcode;
pub use config::{ClientConfig, ConfigError, Masking};
pub use error::{ClientError, ProtocolViolation};
