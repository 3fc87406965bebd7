//! Inbound frame decoding over a [`TransportReader`].

use bytes::Bytes;
use tokio::io::AsyncRead;

use super::{Frame, FrameHeader, MASK_KEY_LEN, apply_mask, decode_extended_len};
use crate::{
    error::{ClientError, ProtocolViolation},
    transport::TransportReader,
};

/// Read and unmask one frame.
///
/// Returns `Ok(None)` when the peer closes the stream at any point inside
/// the frame; a truncated frame is a closure, not a decode error.
///
/// # Errors
/// Returns [`ClientError::Transport`] on socket failures and
/// [`ProtocolViolation::MessageTooLarge`] when the announced length exceeds
/// `max_size`.
pub async fn read_frame<R>(
    reader: &mut TransportReader<R>,
    max_size: Option<u64>,
) -> Result<Option<Frame>, ClientError>
where
    R: AsyncRead + Unpin,
{
    let Some(prefix) = reader.recv_exact(2).await? else {
        return Ok(None);
    };
    let &[first, second] = prefix.as_ref() else {
        return Ok(None);
    };
    let header = FrameHeader::from_bytes(first, second);

    let len = match header.extended_len() {
        0 => u64::from(header.len7),
        width => match reader.recv_exact(width).await? {
            Some(bytes) => decode_extended_len(&bytes),
            None => return Ok(None),
        },
    };
    if let Some(limit) = max_size.filter(|limit| len > *limit) {
        return Err(ProtocolViolation::MessageTooLarge { size: len, limit }.into());
    }

    let mut mask = [0u8; MASK_KEY_LEN];
    if header.masked {
        let Some(key) = reader.recv_exact(MASK_KEY_LEN).await? else {
            return Ok(None);
        };
        mask.copy_from_slice(&key);
    }

    let len = usize::try_from(len).map_err(|_| ProtocolViolation::MessageTooLarge {
        size: len,
        limit: usize::MAX as u64,
    })?;
    let payload = if len == 0 {
        Bytes::new()
    } else {
        let Some(mut body) = reader.recv_exact(len).await? else {
            return Ok(None);
        };
        apply_mask(&mut body, mask);
        body.freeze()
    };

    Ok(Some(Frame {
        fin: header.fin,
        opcode: header.opcode,
        masked: header.masked,
        mask,
        payload,
    }))
}
