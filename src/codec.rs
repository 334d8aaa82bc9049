//! Frame codec.
//!
//! Every frame on the wire is `[4-byte big-endian length][bincode payload]`.
//! Encoding produces the whole frame; decoding is its exact inverse. The
//! `FrameBuffer` accumulates raw reads and yields complete payloads, so the
//! transport reader never blocks mid-frame on a partial header.

use crate::error::BridgeError;
use crate::protocol::Message;

pub const HEADER_LEN: usize = 4;

/// Encodes one message as a complete frame, header included.
pub fn encode(message: &Message, max_payload: usize) -> Result<Vec<u8>, BridgeError> {
    let payload = bincode::serialize(message).map_err(|source| BridgeError::Encode { source })?;
    if payload.len() > max_payload {
        return Err(BridgeError::FrameTooLarge {
            len: payload.len(),
            max: max_payload,
        });
    }

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decodes one frame payload (header already stripped).
pub fn decode_payload(payload: &[u8]) -> Result<Message, BridgeError> {
    bincode::deserialize(payload).map_err(|source| BridgeError::Decode { source })
}

/// Incremental reassembler for the reader thread.
///
/// Bytes go in via `extend`; `next_payload` drains at most one complete
/// payload per call and leaves partial frames buffered.
#[derive(Debug)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    max_payload: usize,
}

impl FrameBuffer {
    pub fn new(max_payload: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_payload,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Returns the next complete payload, `None` if more bytes are needed.
    ///
    /// An oversized length header is unrecoverable: the stream offset can no
    /// longer be trusted, so the caller must drop the connection.
    pub fn next_payload(&mut self) -> Result<Option<Vec<u8>>, BridgeError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let mut header = [0_u8; HEADER_LEN];
        header.copy_from_slice(&self.buf[..HEADER_LEN]);
        let len = u32::from_be_bytes(header) as usize;
        if len > self.max_payload {
            return Err(BridgeError::FrameTooLarge {
                len,
                max: self.max_payload,
            });
        }

        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }

        let payload = self.buf[HEADER_LEN..HEADER_LEN + len].to_vec();
        self.buf.drain(..HEADER_LEN + len);
        Ok(Some(payload))
    }
}
