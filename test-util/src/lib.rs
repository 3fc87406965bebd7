//! Utilities for integration tests.
//!
//! The `test-util` crate provides a scripted WebSocket server listening on a
//! real loopback socket, helpers for building unmasked server frames, and a
//! [`RecordingHandler`] that turns client callbacks into awaitable events.

#![expect(clippy::expect_used, reason = "test helpers fail loudly on setup errors")]

mod frames;
mod handler;
mod server;

/// Boxed error used by test helpers.
pub type AnyError = anyhow::Error;

pub use frames::{close_frame, server_frame};
pub use handler::{Event, Events, RecordingHandler};
pub use server::{MockServer, RecordedRequest, Step, Transcript};
