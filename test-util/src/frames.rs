//! Server-side frame construction.

#![expect(clippy::big_endian_bytes, reason = "network protocol uses big-endian")]

use bytes::{BufMut, BytesMut};
use wsclient::Opcode;

/// Encode one unmasked frame as a server would send it.
///
/// # Panics
///
/// Panics if the payload length does not fit in a `u64`.
#[must_use]
pub fn server_frame(fin: bool, opcode: Opcode, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(payload.len() + 10);
    let fin_bit = if fin { 0x80 } else { 0 };
    buf.put_u8(fin_bit | opcode.bits());
    let len = u64::try_from(payload.len()).expect("payload length fits u64");
    match len {
        0..=125 => buf.put_u8(u8::try_from(len).expect("inline length")),
        126..=0xFFFF => {
            buf.put_u8(126);
            buf.put_slice(&u16::try_from(len).expect("16-bit length").to_be_bytes());
        }
        _ => {
            buf.put_u8(127);
            buf.put_slice(&len.to_be_bytes());
        }
    }
    buf.put_slice(payload);
    buf.to_vec()
}

/// A close frame with an empty body.
#[must_use]
pub fn close_frame() -> Vec<u8> { server_frame(true, Opcode::Close, &[]) }
