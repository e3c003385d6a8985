//! Reply decoders.
//!
//! Each decoder takes one received [`Frame`], checks its opcode and shapes the
//! payload. A status frame arriving where a data frame was expected carries
//! the device's refusal and surfaces as [`ProtocolError::Status`].

use std::collections::HashMap;

use bytes::{Buf, BytesMut};

use crate::core::header::AfcHeader;
use crate::core::opcode::OpCode;
use crate::core::strings::{parse_info_dictionary, parse_string_list};
use crate::error::{AfcError, ProtocolError, Result};
use crate::protocol::{FileHandle, TellByteOrder};

const U64_LEN: usize = 8;

/// One received frame, header already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: AfcHeader,
    pub payload: BytesMut,
}

impl Frame {
    pub fn operation(&self) -> OpCode {
        self.header.operation
    }

    /// Payload of a frame that must carry `expected`.
    pub fn expect(self, expected: OpCode) -> Result<BytesMut> {
        let received = self.header.operation;
        if received == expected {
            return Ok(self.payload);
        }

        if received == OpCode::Status {
            let code = status_code(self.payload)?;
            if !code.is_success() {
                return Err(ProtocolError::Status(code));
            }
        }

        Err(ProtocolError::UnexpectedOperation { expected, received })
    }
}

fn fixed_u64(mut payload: BytesMut, operation: OpCode) -> Result<BytesMut> {
    if payload.len() != U64_LEN {
        return Err(ProtocolError::InvalidResponseSize {
            operation,
            size: payload.len(),
        });
    }
    Ok(payload.split_to(U64_LEN))
}

fn status_code(payload: BytesMut) -> Result<AfcError> {
    let mut value = fixed_u64(payload, OpCode::Status)?;
    Ok(AfcError::from_wire(value.get_u64_le()))
}

/// Status code of a status reply, whatever its value.
pub fn decode_status(frame: Frame) -> Result<AfcError> {
    status_code(frame.expect(OpCode::Status)?)
}

/// Status reply that must report success.
pub fn expect_success(frame: Frame) -> Result<()> {
    match decode_status(frame)? {
        AfcError::Success => Ok(()),
        code => Err(ProtocolError::Status(code)),
    }
}

pub fn decode_handle(frame: Frame) -> Result<FileHandle> {
    let mut payload = fixed_u64(frame.expect(OpCode::FileOpenResult)?, OpCode::FileOpenResult)?;
    Ok(FileHandle::new(payload.get_u64_le()))
}

/// Copy a read reply into `dest`, returning the byte count.
pub fn decode_read_into(frame: Frame, dest: &mut [u8]) -> Result<usize> {
    let payload = frame.expect(OpCode::Data)?;
    if payload.len() > dest.len() {
        return Err(ProtocolError::InvalidResponseSize {
            operation: OpCode::Data,
            size: payload.len(),
        });
    }
    dest[..payload.len()].copy_from_slice(&payload);
    Ok(payload.len())
}

pub fn decode_tell(frame: Frame, order: TellByteOrder) -> Result<u64> {
    let mut payload = fixed_u64(frame.expect(OpCode::FileTellResult)?, OpCode::FileTellResult)?;
    Ok(match order {
        TellByteOrder::Little => payload.get_u64_le(),
        TellByteOrder::Big => payload.get_u64(),
    })
}

pub fn decode_string_list(frame: Frame) -> Result<Vec<String>> {
    parse_string_list(&frame.expect(OpCode::Data)?)
}

pub fn decode_info(frame: Frame) -> Result<HashMap<String, String>> {
    parse_info_dictionary(&frame.expect(OpCode::Data)?)
}
