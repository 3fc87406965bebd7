//! Socket plumbing for the client.
//!
//! [`connect`] resolves the target and opens a TCP stream, [`split`] turns
//! any duplex stream into the buffered [`TransportReader`] used by the
//! handshake and receive loop and the [`TransportWriter`] used for sends.
//! Nothing in here knows about HTTP or WebSocket framing.

mod connect;
mod errors;
mod reader;
mod writer;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::{
    connect::{Connected, connect, reverse_lookup},
    errors::TransportError,
    reader::TransportReader,
    writer::TransportWriter,
};

/// Bytes requested from the socket per read.
pub const READ_CHUNK: usize = 4096;
/// Default upper bound for an HTTP response header block.
pub const DEFAULT_MAX_HEADER_SIZE: usize = 16 * 1024;

/// Type-erased read half shared by every stream type.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
/// Type-erased write half shared by every stream type.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Split a duplex stream into type-erased reader and writer halves.
///
/// Any decorated stream (TLS, a proxy tunnel, an in-memory pipe) works as
/// long as it is `Send + 'static`.
pub fn split<S>(stream: S) -> (TransportReader<BoxedReader>, TransportWriter<BoxedWriter>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    (
        TransportReader::new(Box::new(read_half) as BoxedReader),
        TransportWriter::new(Box::new(write_half) as BoxedWriter),
    )
}
