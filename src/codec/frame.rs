//! RFC 6455 frame header layout.
//!
//! Outbound frames always carry FIN and MASK; inbound frames may set either.
//! Lengths are encoded minimally: up to 125 inline, then a 16-bit and finally
//! a 64-bit extended field, both in network byte order.

#![expect(clippy::big_endian_bytes, reason = "network protocol uses big-endian")]

use bytes::{BufMut, Bytes, BytesMut};

use super::{
    FIN_BIT,
    LEN_16_MARKER,
    LEN_64_MARKER,
    MASK_BIT,
    MASK_KEY_LEN,
    MAX_INLINE_LEN,
    MAX_U16_LEN,
    Opcode,
};

/// Width of the length field chosen for a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthClass {
    /// Length fits in the seven-bit field.
    Inline,
    /// Length follows as a 16-bit extended field.
    Extended16,
    /// Length follows as a 64-bit extended field.
    Extended64,
}

impl LengthClass {
    /// Pick the minimal length class for a payload of `len` bytes.
    #[must_use]
    pub const fn for_len(len: u64) -> Self {
        if len <= MAX_INLINE_LEN {
            Self::Inline
        } else if len <= MAX_U16_LEN {
            Self::Extended16
        } else {
            Self::Extended64
        }
    }

    /// Number of extended length bytes following the first two header bytes.
    #[must_use]
    pub const fn extended_len(self) -> usize {
        match self {
            Self::Inline => 0,
            Self::Extended16 => 2,
            Self::Extended64 => 8,
        }
    }

    /// Total size of a masked client header in this class: 6, 8 or 14 bytes.
    #[must_use]
    pub const fn masked_header_len(self) -> usize { 2 + self.extended_len() + MASK_KEY_LEN }
}

/// The fixed two-byte prefix of every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// Final fragment of a message.
    pub fin: bool,
    /// Frame type.
    pub opcode: Opcode,
    /// A masking key follows the length fields.
    pub masked: bool,
    /// Seven-bit length, or one of the 126/127 extension markers.
    pub len7: u8,
}

impl FrameHeader {
    /// Parse the first two bytes of a frame.
    #[must_use]
    pub const fn from_bytes(first: u8, second: u8) -> Self {
        Self {
            fin: first & FIN_BIT != 0,
            opcode: Opcode::from_bits(first),
            masked: second & MASK_BIT != 0,
            len7: second & 0x7F,
        }
    }

    /// Number of extended length bytes announced by `len7`.
    #[must_use]
    pub const fn extended_len(&self) -> usize {
        match self.len7 {
            LEN_16_MARKER => 2,
            LEN_64_MARKER => 8,
            _ => 0,
        }
    }
}

/// One decoded frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment of a message.
    pub fin: bool,
    /// Frame type.
    pub opcode: Opcode,
    /// The sender masked the payload.
    pub masked: bool,
    /// Masking key; all zero when the frame was not masked.
    pub mask: [u8; MASK_KEY_LEN],
    /// Unmasked payload.
    pub payload: Bytes,
}

impl Frame {
    /// Payload length as carried on the wire.
    #[must_use]
    pub fn payload_len(&self) -> u64 { self.payload.len() as u64 }
}

/// Append a FIN-terminated, masked header for a `len`-byte payload to `dst`.
pub fn encode_header(opcode: Opcode, len: u64, mask: [u8; MASK_KEY_LEN], dst: &mut BytesMut) {
    let class = LengthClass::for_len(len);
    dst.reserve(class.masked_header_len());
    dst.put_u8(FIN_BIT | opcode.bits());
    match class {
        LengthClass::Inline => {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "inline lengths are at most 125"
            )]
            dst.put_u8(MASK_BIT | len as u8);
        }
        LengthClass::Extended16 => {
            dst.put_u8(MASK_BIT | LEN_16_MARKER);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "16-bit class holds lengths up to 65535"
            )]
            dst.put_slice(&(len as u16).to_be_bytes());
        }
        LengthClass::Extended64 => {
            dst.put_u8(MASK_BIT | LEN_64_MARKER);
            dst.put_slice(&len.to_be_bytes());
        }
    }
    dst.put_slice(&mask);
}

/// XOR `payload` in place with the repeating four-byte `mask`.
///
/// Masking is an involution, so the same call unmasks.
pub fn apply_mask(payload: &mut [u8], mask: [u8; MASK_KEY_LEN]) {
    if mask == [0; MASK_KEY_LEN] {
        return;
    }
    for (byte, key) in payload.iter_mut().zip(mask.iter().cycle()) {
        *byte ^= key;
    }
}

/// Read a big-endian extended length field of two or eight bytes.
#[must_use]
pub fn decode_extended_len(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}
