//! Tokio codec framing AFC packets over a byte stream.
//!
//! Encoding stamps each request with the next packet number. Decoding waits
//! for a full header, validates it, then waits for `ThisLength` bytes before
//! yielding a [`Frame`]. Frames longer than the configured maximum are
//! rejected before any payload is buffered.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::core::header::{AfcHeader, PacketCounter, HEADER_LENGTH};
use crate::core::request::Request;
use crate::core::response::Frame;
use crate::error::{ProtocolError, Result};

/// Default cap on a single received frame: a maximal read plus its header.
pub const DEFAULT_MAX_FRAME_LENGTH: u64 = 16 * 1024 * 1024 + HEADER_LENGTH;

/// Frames requests onto, and replies off, an AFC byte channel.
///
/// The codec owns the packet counter, so every client numbers its own frames.
#[derive(Debug, Clone)]
pub struct AfcCodec {
    counter: PacketCounter,
    max_frame_length: u64,
}

impl AfcCodec {
    pub fn new(max_frame_length: u64) -> Self {
        Self {
            counter: PacketCounter::new(),
            max_frame_length,
        }
    }
}

impl Default for AfcCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl Decoder for AfcCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if src.len() < HEADER_LENGTH as usize {
            return Ok(None);
        }

        let header = AfcHeader::decode(&src[..HEADER_LENGTH as usize])?;
        if header.this_length > self.max_frame_length {
            return Err(ProtocolError::OversizedPacket(header.this_length));
        }

        let frame_length = header.this_length as usize;
        if src.len() < frame_length {
            src.reserve(frame_length - src.len());
            return Ok(None);
        }

        let mut payload = src.split_to(frame_length);
        payload.advance(HEADER_LENGTH as usize);
        trace!(operation = ?header.operation, bytes = payload.len(), "Frame decoded");

        Ok(Some(Frame { header, payload }))
    }
}

impl Encoder<Request> for AfcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(item.frame_length() as usize);
        item.header(self.counter.next()).encode_into(dst);
        item.encode_payload(dst);
        Ok(())
    }
}
