//! Request frames.
//!
//! Every request kind is one variant of [`Request`]; the codec matches on it
//! once to pick the opcode and lay out the payload. Large writes are split
//! by [`WriteChunks`] into several frames sharing one `entire_length`.

use bytes::{BufMut, Bytes};

use crate::core::header::{AfcHeader, HEADER_LENGTH};
use crate::core::opcode::OpCode;
use crate::core::strings::{c_string_len, put_c_string};
use crate::error::{AfcError, ProtocolError, Result};
use crate::protocol::{FileHandle, LinkType, LockMode, OpenMode};

const U64_LEN: u64 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Open { mode: OpenMode, path: String },
    Close { handle: FileHandle },
    Read { handle: FileHandle, size: u64 },
    Write(WriteChunk),
    Lock { handle: FileHandle, mode: LockMode },
    Seek { handle: FileHandle, whence: u64, offset: i64 },
    Tell { handle: FileHandle },
    SetFileSize { handle: FileHandle, size: u64 },
    Remove { path: String },
    FileInfo { path: String },
    ReadDirectory { path: String },
    MakeDirectory { path: String },
    Rename { from: String, to: String },
    MakeLink { kind: LinkType, target: String, link: String },
    DeviceInfo,
}

/// One physical frame of a logical write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteChunk {
    pub handle: FileHandle,
    pub data: Bytes,
    /// Header plus payload length of the whole logical write.
    pub entire_length: u64,
}

impl Request {
    pub fn opcode(&self) -> OpCode {
        match self {
            Request::Open { .. } => OpCode::FileOpen,
            Request::Close { .. } => OpCode::FileClose,
            Request::Read { .. } => OpCode::FileRead,
            Request::Write(_) => OpCode::FileWrite,
            Request::Lock { .. } => OpCode::FileLock,
            Request::Seek { .. } => OpCode::FileSeek,
            Request::Tell { .. } => OpCode::FileTell,
            Request::SetFileSize { .. } => OpCode::FileSetSize,
            Request::Remove { .. } => OpCode::RemovePath,
            Request::FileInfo { .. } => OpCode::GetFileInfo,
            Request::ReadDirectory { .. } => OpCode::ReadDir,
            Request::MakeDirectory { .. } => OpCode::MakeDir,
            Request::Rename { .. } => OpCode::RenamePath,
            Request::MakeLink { .. } => OpCode::MakeLink,
            Request::DeviceInfo => OpCode::GetDeviceInfo,
        }
    }

    /// Payload bytes following the header.
    pub fn payload_length(&self) -> u64 {
        match self {
            Request::Open { path, .. } => U64_LEN + c_string_len(path),
            Request::Close { .. } | Request::Tell { .. } => U64_LEN,
            Request::Read { .. }
            | Request::Lock { .. }
            | Request::SetFileSize { .. } => U64_LEN * 2,
            Request::Seek { .. } => U64_LEN * 3,
            Request::Write(chunk) => U64_LEN + chunk.data.len() as u64,
            Request::Remove { path }
            | Request::FileInfo { path }
            | Request::ReadDirectory { path }
            | Request::MakeDirectory { path } => c_string_len(path),
            Request::Rename { from, to } => c_string_len(from) + c_string_len(to),
            Request::MakeLink { target, link, .. } => {
                U64_LEN + c_string_len(target) + c_string_len(link)
            }
            Request::DeviceInfo => 0,
        }
    }

    pub fn header(&self, packet_number: u64) -> AfcHeader {
        let mut header = AfcHeader::single(self.payload_length(), packet_number, self.opcode());
        if let Request::Write(chunk) = self {
            header.entire_length = chunk.entire_length;
        }
        header
    }

    /// Header plus payload.
    pub fn frame_length(&self) -> u64 {
        HEADER_LENGTH + self.payload_length()
    }

    pub fn encode_payload<B: BufMut>(&self, dst: &mut B) {
        match self {
            Request::Open { mode, path } => {
                dst.put_u64_le(mode.wire_value());
                put_c_string(dst, path);
            }
            Request::Close { handle } | Request::Tell { handle } => {
                dst.put_u64_le(handle.raw());
            }
            Request::Read { handle, size } | Request::SetFileSize { handle, size } => {
                dst.put_u64_le(handle.raw());
                dst.put_u64_le(*size);
            }
            Request::Write(chunk) => {
                dst.put_u64_le(chunk.handle.raw());
                dst.put_slice(&chunk.data);
            }
            Request::Lock { handle, mode } => {
                dst.put_u64_le(handle.raw());
                dst.put_u64_le(mode.wire_value());
            }
            Request::Seek {
                handle,
                whence,
                offset,
            } => {
                dst.put_u64_le(handle.raw());
                dst.put_u64_le(*whence);
                dst.put_i64_le(*offset);
            }
            Request::Remove { path }
            | Request::FileInfo { path }
            | Request::ReadDirectory { path }
            | Request::MakeDirectory { path } => put_c_string(dst, path),
            Request::Rename { from, to } => {
                put_c_string(dst, from);
                put_c_string(dst, to);
            }
            Request::MakeLink { kind, target, link } => {
                dst.put_u64_le(kind.wire_value());
                put_c_string(dst, target);
                put_c_string(dst, link);
            }
            Request::DeviceInfo => {}
        }
    }
}

/// Splits a logical write into header-prefixed chunks, in order.
#[derive(Debug, Clone)]
pub struct WriteChunks {
    handle: FileHandle,
    data: Bytes,
    chunk_size: usize,
    offset: usize,
    entire_length: u64,
}

impl WriteChunks {
    pub fn new(handle: FileHandle, data: Bytes, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ProtocolError::afc(
                AfcError::InvalidArg,
                "write chunk size must be greater than zero",
            ));
        }

        let chunk_count = data.len().div_ceil(chunk_size) as u64;
        let entire_length = (HEADER_LENGTH + U64_LEN) * chunk_count + data.len() as u64;

        Ok(Self {
            handle,
            data,
            chunk_size,
            offset: 0,
            entire_length,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.data.len().div_ceil(self.chunk_size)
    }

    pub fn entire_length(&self) -> u64 {
        self.entire_length
    }
}

impl Iterator for WriteChunks {
    type Item = Request;

    fn next(&mut self) -> Option<Request> {
        if self.offset >= self.data.len() {
            return None;
        }

        let end = (self.offset + self.chunk_size).min(self.data.len());
        let data = self.data.slice(self.offset..end);
        self.offset = end;

        Some(Request::Write(WriteChunk {
            handle: self.handle,
            data,
            entire_length: self.entire_length,
        }))
    }
}
