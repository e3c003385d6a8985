//! Operation identifiers carried in every AFC header.

use serde::{Deserialize, Serialize};

/// Wire operation identifiers.
///
/// The numbering is fixed by the device; identifiers this crate does not
/// model are kept in [`OpCode::Other`] so a header can always be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpCode {
    Invalid,
    Status,
    Data,
    ReadDir,
    ReadFile,
    WriteFile,
    WritePart,
    Truncate,
    RemovePath,
    MakeDir,
    GetFileInfo,
    GetDeviceInfo,
    WriteFileAtom,
    FileOpen,
    FileOpenResult,
    FileRead,
    FileWrite,
    FileSeek,
    FileTell,
    FileTellResult,
    FileClose,
    FileSetSize,
    GetConInfo,
    SetConOptions,
    RenamePath,
    SetFsBlockSize,
    SetSocketBlockSize,
    FileLock,
    MakeLink,
    SetFileTime,
    Other(u64),
}

impl OpCode {
    pub fn from_wire(value: u64) -> Self {
        match value {
            0x00 => OpCode::Invalid,
            0x01 => OpCode::Status,
            0x02 => OpCode::Data,
            0x03 => OpCode::ReadDir,
            0x04 => OpCode::ReadFile,
            0x05 => OpCode::WriteFile,
            0x06 => OpCode::WritePart,
            0x07 => OpCode::Truncate,
            0x08 => OpCode::RemovePath,
            0x09 => OpCode::MakeDir,
            0x0a => OpCode::GetFileInfo,
            0x0b => OpCode::GetDeviceInfo,
            0x0c => OpCode::WriteFileAtom,
            0x0d => OpCode::FileOpen,
            0x0e => OpCode::FileOpenResult,
            0x0f => OpCode::FileRead,
            0x10 => OpCode::FileWrite,
            0x11 => OpCode::FileSeek,
            0x12 => OpCode::FileTell,
            0x13 => OpCode::FileTellResult,
            0x14 => OpCode::FileClose,
            0x15 => OpCode::FileSetSize,
            0x16 => OpCode::GetConInfo,
            0x17 => OpCode::SetConOptions,
            0x18 => OpCode::RenamePath,
            0x19 => OpCode::SetFsBlockSize,
            0x1a => OpCode::SetSocketBlockSize,
            0x1b => OpCode::FileLock,
            0x1c => OpCode::MakeLink,
            0x1e => OpCode::SetFileTime,
            other => OpCode::Other(other),
        }
    }

    pub fn wire_value(&self) -> u64 {
        match self {
            OpCode::Invalid => 0x00,
            OpCode::Status => 0x01,
            OpCode::Data => 0x02,
            OpCode::ReadDir => 0x03,
            OpCode::ReadFile => 0x04,
            OpCode::WriteFile => 0x05,
            OpCode::WritePart => 0x06,
            OpCode::Truncate => 0x07,
            OpCode::RemovePath => 0x08,
            OpCode::MakeDir => 0x09,
            OpCode::GetFileInfo => 0x0a,
            OpCode::GetDeviceInfo => 0x0b,
            OpCode::WriteFileAtom => 0x0c,
            OpCode::FileOpen => 0x0d,
            OpCode::FileOpenResult => 0x0e,
            OpCode::FileRead => 0x0f,
            OpCode::FileWrite => 0x10,
            OpCode::FileSeek => 0x11,
            OpCode::FileTell => 0x12,
            OpCode::FileTellResult => 0x13,
            OpCode::FileClose => 0x14,
            OpCode::FileSetSize => 0x15,
            OpCode::GetConInfo => 0x16,
            OpCode::SetConOptions => 0x17,
            OpCode::RenamePath => 0x18,
            OpCode::SetFsBlockSize => 0x19,
            OpCode::SetSocketBlockSize => 0x1a,
            OpCode::FileLock => 0x1b,
            OpCode::MakeLink => 0x1c,
            OpCode::SetFileTime => 0x1e,
            OpCode::Other(value) => *value,
        }
    }
}
