//! Outbound frame encoder.

use std::io;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tokio_util::codec::Encoder;

use super::{MASK_KEY_LEN, Opcode, apply_mask, encode_header};

/// How outbound payloads are masked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Masking {
    /// Set the MASK bit with an all-zero key, leaving payload bytes as-is.
    ///
    /// This matches the wire bytes of existing deployments of this client.
    #[default]
    Zero,
    /// Draw a fresh random key for every frame and XOR the payload.
    Random,
}

impl Masking {
    /// Produce the masking key for the next frame.
    #[must_use]
    pub fn next_key(self) -> [u8; MASK_KEY_LEN] {
        match self {
            Self::Zero => [0; MASK_KEY_LEN],
            Self::Random => rand::random(),
        }
    }
}

impl std::str::FromStr for Masking {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "zero" => Ok(Self::Zero),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown masking mode {other:?}; expected zero or random")),
        }
    }
}

/// A single complete frame waiting to be encoded.
#[derive(Clone, Copy, Debug)]
pub struct OutboundFrame<'a> {
    /// Frame type.
    pub opcode: Opcode,
    /// Payload bytes before masking.
    pub payload: &'a [u8],
}

impl<'a> OutboundFrame<'a> {
    /// Pair an opcode with its payload.
    #[must_use]
    pub const fn new(opcode: Opcode, payload: &'a [u8]) -> Self { Self { opcode, payload } }
}

/// Encoder producing FIN-terminated client frames.
///
/// Messages are never fragmented on the way out.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameEncoder {
    masking: Masking,
}

impl FrameEncoder {
    /// Create an encoder using `masking` for every frame.
    #[must_use]
    pub const fn new(masking: Masking) -> Self { Self { masking } }

    /// Masking strategy in effect.
    #[must_use]
    pub const fn masking(&self) -> Masking { self.masking }
}

impl Encoder<OutboundFrame<'_>> for FrameEncoder {
    type Error = io::Error;

    fn encode(&mut self, item: OutboundFrame<'_>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let len = u64::try_from(item.payload.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "payload too large"))?;
        let mask = self.masking.next_key();
        encode_header(item.opcode, len, mask, dst);
        let start = dst.len();
        dst.extend_from_slice(item.payload);
        if let Some(body) = dst.get_mut(start..) {
            apply_mask(body, mask);
        }
        Ok(())
    }
}
