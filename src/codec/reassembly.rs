//! Fragmented message reassembly.
//!
//! A message is one or more frames chained by `fin = 0` and closed by a
//! `fin = 1` frame. The opcode of the first fragment names the message; the
//! payloads are concatenated in arrival order. Control frames may arrive
//! between fragments and are delivered on their own without disturbing the
//! message under construction.

use bytes::{Bytes, BytesMut};

use super::{Frame, Opcode};
use crate::error::ProtocolViolation;

/// A complete, application-visible message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Opcode of the first fragment.
    pub opcode: Opcode,
    /// Concatenated payload of all fragments.
    pub payload: Bytes,
}

impl Message {
    /// Build a message from an opcode and payload.
    #[must_use]
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Payload as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> { std::str::from_utf8(&self.payload).ok() }

    /// Whether this message is a control message.
    #[must_use]
    pub const fn is_control(&self) -> bool { self.opcode.is_control() }
}

/// Fragmentation state threaded between frames of one connection.
///
/// A final control frame never joins the buffered message, even when it
/// arrives mid-message. Naive "fin with a non-empty buffer flushes" handling
/// would append a ping payload to the pending text and drop the ping; here
/// the control frame is returned immediately and the next continuation
/// frame still completes the original message.
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: BytesMut,
    last_opcode: Option<Opcode>,
    max_size: Option<u64>,
}

impl Reassembler {
    /// Create a reassembler rejecting messages longer than `max_size` bytes.
    #[must_use]
    pub fn new(max_size: Option<u64>) -> Self {
        Self {
            buffer: BytesMut::new(),
            last_opcode: None,
            max_size,
        }
    }

    /// Whether no fragmented message is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool { self.buffer.is_empty() && self.last_opcode.is_none() }

    /// Feed one frame, returning a message once it is complete.
    ///
    /// # Errors
    /// Returns [`ProtocolViolation::MessageTooLarge`] when the accumulated
    /// payload exceeds the configured limit.
    pub fn push(&mut self, frame: Frame) -> Result<Option<Message>, ProtocolViolation> {
        if frame.fin && frame.opcode.is_control() {
            return Ok(Some(Message::new(frame.opcode, frame.payload)));
        }
        self.check_size(frame.payload.len())?;
        if !frame.fin {
            if frame.opcode != Opcode::Continuation {
                self.last_opcode = Some(frame.opcode);
            }
            self.buffer.extend_from_slice(&frame.payload);
            return Ok(None);
        }
        if self.buffer.is_empty() {
            self.last_opcode = None;
            return Ok(Some(Message::new(frame.opcode, frame.payload)));
        }
        self.buffer.extend_from_slice(&frame.payload);
        let opcode = self.last_opcode.take().unwrap_or(Opcode::Continuation);
        let payload = self.buffer.split().freeze();
        Ok(Some(Message::new(opcode, payload)))
    }

    fn check_size(&self, incoming: usize) -> Result<(), ProtocolViolation> {
        let Some(limit) = self.max_size else {
            return Ok(());
        };
        let size = (self.buffer.len() as u64).saturating_add(incoming as u64);
        if size > limit {
            return Err(ProtocolViolation::MessageTooLarge { size, limit });
        }
        Ok(())
    }
}
