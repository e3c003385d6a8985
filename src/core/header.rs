//! Fixed 40-byte AFC packet envelope.
//!
//! ```text
//! [Magic(8, BE)] [EntireLength(8, LE)] [ThisLength(8, LE)] [PacketNumber(8, LE)] [Operation(8, LE)]
//! ```
//!
//! `EntireLength` spans the whole logical message, which for chunked writes
//! covers several physical frames. `ThisLength` covers only the frame it heads.

use bytes::{Buf, BufMut};

use crate::core::opcode::OpCode;
use crate::error::{ProtocolError, Result};

/// ASCII `CFA6LPAA`, written big-endian.
pub const MAGIC: u64 = 0x4346_4136_4C50_4141;

/// Five 8-byte fields.
pub const HEADER_LENGTH: u64 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AfcHeader {
    pub entire_length: u64,
    pub this_length: u64,
    pub packet_number: u64,
    pub operation: OpCode,
}

impl AfcHeader {
    /// Header for a frame that is its own whole message.
    pub fn single(payload_length: u64, packet_number: u64, operation: OpCode) -> Self {
        let length = HEADER_LENGTH + payload_length;
        Self {
            entire_length: length,
            this_length: length,
            packet_number,
            operation,
        }
    }

    /// Bytes following the header in this frame.
    pub fn data_length(&self) -> u64 {
        self.this_length - HEADER_LENGTH
    }

    pub fn encode_into<B: BufMut>(&self, dst: &mut B) {
        dst.put_u64(MAGIC);
        dst.put_u64_le(self.entire_length);
        dst.put_u64_le(self.this_length);
        dst.put_u64_le(self.packet_number);
        dst.put_u64_le(self.operation.wire_value());
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LENGTH as usize] {
        let mut out = [0u8; HEADER_LENGTH as usize];
        let mut cursor = &mut out[..];
        self.encode_into(&mut cursor);
        out
    }

    /// Decode the first 40 bytes of `src`.
    pub fn decode(mut src: &[u8]) -> Result<Self> {
        if src.len() < HEADER_LENGTH as usize {
            return Err(ProtocolError::TruncatedHeader(src.len() as u64));
        }

        if src.get_u64() != MAGIC {
            return Err(ProtocolError::BadMagic);
        }

        let entire_length = src.get_u64_le();
        let this_length = src.get_u64_le();
        if this_length < HEADER_LENGTH {
            return Err(ProtocolError::TruncatedHeader(this_length));
        }

        let packet_number = src.get_u64_le();
        let operation = OpCode::from_wire(src.get_u64_le());

        Ok(Self {
            entire_length,
            this_length,
            packet_number,
            operation,
        })
    }
}

/// Advisory packet numbers for outgoing frames.
///
/// Starts at `u64::MAX` and wraps, so the first frame carries 0. Each client
/// owns its own counter; numbers are unique per connection only.
#[derive(Debug, Clone)]
pub struct PacketCounter {
    last: u64,
}

impl PacketCounter {
    pub fn new() -> Self {
        Self { last: u64::MAX }
    }

    pub fn next(&mut self) -> u64 {
        self.last = self.last.wrapping_add(1);
        self.last
    }
}

impl Default for PacketCounter {
    fn default() -> Self {
        Self::new()
    }
}
