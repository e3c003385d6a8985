//! # Protocol Vocabulary
//!
//! Typed values exchanged with the device: file handles, open/lock modes,
//! link kinds and the normalized file info record.

pub mod info;

use std::fmt;
use std::io::SeekFrom;

use serde::{Deserialize, Serialize};

use crate::error::{AfcError, ProtocolError, Result};

pub use info::{FileInfo, FileType};

/// Device-side open file.
///
/// Handles are plain tokens: nothing closes them on drop, every successful
/// open must be paired with [`crate::AfcClient::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileHandle(u64);

impl FileHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Zero is the device's "open failed" sentinel.
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Open modes, mirroring `fopen` semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenMode {
    /// `r`
    ReadOnly,
    /// `r+`
    ReadWrite,
    /// `w`: create or truncate
    WriteOnly,
    /// `w+`
    WriteRead,
    /// `a`
    Append,
    /// `a+`
    ReadAppend,
}

impl OpenMode {
    pub fn wire_value(&self) -> u64 {
        match self {
            OpenMode::ReadOnly => 1,
            OpenMode::ReadWrite => 2,
            OpenMode::WriteOnly => 3,
            OpenMode::WriteRead => 4,
            OpenMode::Append => 5,
            OpenMode::ReadAppend => 6,
        }
    }
}

/// Advisory lock operations; the device always applies them non-blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockMode {
    Shared,
    Exclusive,
    Unlock,
}

impl LockMode {
    const NON_BLOCKING: u64 = 4;

    pub fn wire_value(&self) -> u64 {
        let op = match self {
            LockMode::Shared => 1,
            LockMode::Exclusive => 2,
            LockMode::Unlock => 8,
        };
        op | Self::NON_BLOCKING
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    Hard,
    Symbolic,
}

impl LinkType {
    pub fn wire_value(&self) -> u64 {
        match self {
            LinkType::Hard => 1,
            LinkType::Symbolic => 2,
        }
    }
}

/// Byte order used to read the position in a tell reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TellByteOrder {
    #[default]
    Little,
    Big,
}

/// Translate a seek position into the wire `(whence, offset)` pair.
pub fn seek_parameters(pos: SeekFrom) -> Result<(u64, i64)> {
    match pos {
        SeekFrom::Start(offset) => {
            let offset = i64::try_from(offset).map_err(|_| {
                ProtocolError::afc(AfcError::InvalidArg, format!("seek offset {offset} too large"))
            })?;
            Ok((0, offset))
        }
        SeekFrom::Current(offset) => Ok((1, offset)),
        SeekFrom::End(offset) => Ok((2, offset)),
    }
}
