//! AFL target for the inbound parsers.
//!
//! Each test case is fed both to the HTTP response parser and to the frame
//! decoder. Errors are expected; only panics count as findings.

use wsclient::{codec::read_frame, handshake::parse_response, transport::TransportReader};

/// Largest frame the decoder may allocate for while fuzzing.
const MAX_FRAME: u64 = 1 << 20;

fn main() {
    let Ok(runtime) = tokio::runtime::Builder::new_current_thread().build() else {
        return;
    };
    afl::fuzz!(|data: &[u8]| {
        let _response = parse_response(data);
        runtime.block_on(async {
            let mut reader = TransportReader::new(data);
            while let Ok(Some(_frame)) = read_frame(&mut reader, Some(MAX_FRAME)).await {}
        });
    });
}
