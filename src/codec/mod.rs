//! WebSocket frame codec.
//!
//! [`frame`] owns the RFC 6455 header layout, [`FrameEncoder`] turns
//! outbound payloads into client frames, [`read_frame`] decodes inbound
//! frames from a transport reader, and [`Reassembler`] carries the
//! fragmentation state between frames.

mod decode;
mod encoder;
pub mod frame;
mod opcode;
mod reassembly;

pub use self::{
    decode::read_frame,
    encoder::{FrameEncoder, Masking, OutboundFrame},
    frame::{Frame, FrameHeader, LengthClass, apply_mask, decode_extended_len, encode_header},
    opcode::Opcode,
    reassembly::{Message, Reassembler},
};

/// Largest payload length carried in the seven-bit field.
pub const MAX_INLINE_LEN: u64 = 125;
/// Largest payload length carried in the 16-bit extended field.
pub const MAX_U16_LEN: u64 = 0xFFFF;
/// Seven-bit marker announcing a 16-bit extended length.
pub const LEN_16_MARKER: u8 = 126;
/// Seven-bit marker announcing a 64-bit extended length.
pub const LEN_64_MARKER: u8 = 127;
/// FIN flag in the first header byte.
pub const FIN_BIT: u8 = 0x80;
/// MASK flag in the second header byte.
pub const MASK_BIT: u8 = 0x80;
/// Size of a masking key.
pub const MASK_KEY_LEN: usize = 4;
/// Largest possible client frame header.
pub const MAX_HEADER_LEN: usize = 14;
