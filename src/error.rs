//! # Error Types
//!
//! Error handling for the AFC client.
//!
//! Two vocabularies live here. [`AfcError`] is the closed set of status codes
//! the device reports on the wire. [`ProtocolError`] is the single error type
//! returned by every fallible operation of this crate; it wraps wire statuses
//! and adds framing failures and local contract violations.
//!
//! ## Error Categories
//! - **Framing Errors**: bad magic, truncated or oversized headers, unexpected
//!   opcodes, malformed string lists. Fatal to the call, never retried.
//! - **Wire Status Errors**: any non-success [`AfcError`] returned by the device.
//! - **Contract Violations**: short reads, zero handles, non-regular files.
//! - **Aggregate Failures**: recursive removal reporting every undeleted path.
//!
//! ## Example Usage
//! ```rust
//! use afc_client::error::{AfcError, ProtocolError};
//!
//! fn is_absent(err: &ProtocolError) -> bool {
//!     matches!(err.code(), Some(AfcError::ObjectNotFound))
//! }
//!
//! assert!(is_absent(&ProtocolError::Status(AfcError::ObjectNotFound)));
//! assert!(!is_absent(&ProtocolError::EndOfStream { expected: 4, received: 2 }));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

use crate::core::opcode::OpCode;

/// Error message constants shared by several error paths.
pub mod constants {
    pub const ERR_BAD_MAGIC: &str = "Mismatch in magic bytes for AFC header";
    pub const ERR_TRUNCATED_HEADER: &str = "Expected more bytes in AFC header than received";
    pub const ERR_UNBALANCED_INFO: &str = "Received data not balanced, unable to parse to dictionary";
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_DESYNCHRONIZED: &str =
        "Connection abandoned mid round trip; responses can no longer be correlated";
    pub const ERR_OPEN_FOR_WRITE: &str = "Failed to open file for writing";
}

/// Status codes reported by the device in status replies.
///
/// Values match the device protocol exactly. Codes the crate does not know are
/// kept verbatim in [`AfcError::Unrecognized`] so they survive the round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AfcError {
    Success,
    UnknownError,
    OperationHeaderInvalid,
    NoResources,
    ReadError,
    WriteError,
    UnknownPacketType,
    InvalidArg,
    ObjectNotFound,
    ObjectIsDirectory,
    PermissionDenied,
    ServiceNotConnected,
    OperationTimeout,
    TooMuchData,
    EndOfData,
    OperationNotSupported,
    ObjectExists,
    ObjectBusy,
    NoSpaceLeft,
    OperationWouldBlock,
    IoError,
    OperationInterrupted,
    OperationInProgress,
    InternalError,
    MuxError,
    NoMemory,
    NotEnoughData,
    DirNotEmpty,
    ForceSignedTypeUnsupported,
    /// Client-side code: the device handed back the zero handle. Never sent on the wire.
    OpenFailed,
    Unrecognized(u64),
}

impl AfcError {
    /// Map a wire status value to its code.
    pub fn from_wire(value: u64) -> Self {
        match value {
            0 => AfcError::Success,
            1 => AfcError::UnknownError,
            2 => AfcError::OperationHeaderInvalid,
            3 => AfcError::NoResources,
            4 => AfcError::ReadError,
            5 => AfcError::WriteError,
            6 => AfcError::UnknownPacketType,
            7 => AfcError::InvalidArg,
            8 => AfcError::ObjectNotFound,
            9 => AfcError::ObjectIsDirectory,
            10 => AfcError::PermissionDenied,
            11 => AfcError::ServiceNotConnected,
            12 => AfcError::OperationTimeout,
            13 => AfcError::TooMuchData,
            14 => AfcError::EndOfData,
            15 => AfcError::OperationNotSupported,
            16 => AfcError::ObjectExists,
            17 => AfcError::ObjectBusy,
            18 => AfcError::NoSpaceLeft,
            19 => AfcError::OperationWouldBlock,
            20 => AfcError::IoError,
            21 => AfcError::OperationInterrupted,
            22 => AfcError::OperationInProgress,
            23 => AfcError::InternalError,
            30 => AfcError::MuxError,
            31 => AfcError::NoMemory,
            32 => AfcError::NotEnoughData,
            33 => AfcError::DirNotEmpty,
            u64::MAX => AfcError::ForceSignedTypeUnsupported,
            other => AfcError::Unrecognized(other),
        }
    }

    /// The value carried on the wire, or `None` for client-side codes.
    pub fn wire_value(&self) -> Option<u64> {
        let value = match self {
            AfcError::Success => 0,
            AfcError::UnknownError => 1,
            AfcError::OperationHeaderInvalid => 2,
            AfcError::NoResources => 3,
            AfcError::ReadError => 4,
            AfcError::WriteError => 5,
            AfcError::UnknownPacketType => 6,
            AfcError::InvalidArg => 7,
            AfcError::ObjectNotFound => 8,
            AfcError::ObjectIsDirectory => 9,
            AfcError::PermissionDenied => 10,
            AfcError::ServiceNotConnected => 11,
            AfcError::OperationTimeout => 12,
            AfcError::TooMuchData => 13,
            AfcError::EndOfData => 14,
            AfcError::OperationNotSupported => 15,
            AfcError::ObjectExists => 16,
            AfcError::ObjectBusy => 17,
            AfcError::NoSpaceLeft => 18,
            AfcError::OperationWouldBlock => 19,
            AfcError::IoError => 20,
            AfcError::OperationInterrupted => 21,
            AfcError::OperationInProgress => 22,
            AfcError::InternalError => 23,
            AfcError::MuxError => 30,
            AfcError::NoMemory => 31,
            AfcError::NotEnoughData => 32,
            AfcError::DirNotEmpty => 33,
            AfcError::ForceSignedTypeUnsupported => u64::MAX,
            AfcError::OpenFailed => return None,
            AfcError::Unrecognized(value) => *value,
        };
        Some(value)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AfcError::Success)
    }
}

impl fmt::Display for AfcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AfcError::Unrecognized(value) => write!(f, "Unrecognized({value})"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

// ProtocolError is the primary error type for all client operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{}", constants::ERR_BAD_MAGIC)]
    BadMagic,

    #[error("{} (length {0})", constants::ERR_TRUNCATED_HEADER)]
    TruncatedHeader(u64),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(u64),

    #[error("Unexpected operation in reply: expected {expected:?}, received {received:?}")]
    UnexpectedOperation { expected: OpCode, received: OpCode },

    #[error("Unexpected payload size for {operation:?}: {size} bytes")]
    InvalidResponseSize { operation: OpCode, size: usize },

    #[error("{} ({0} entries)", constants::ERR_UNBALANCED_INFO)]
    UnbalancedInfoPairs(usize),

    #[error("Invalid UTF-8 in reply payload")]
    InvalidUtf8,

    #[error("Invalid value for {key}: {value:?}")]
    InvalidInfoValue { key: String, value: String },

    #[error("AFC status error: {0}")]
    Status(AfcError),

    #[error("AFC error {code}: {message}")]
    Afc { code: AfcError, message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Unexpected end of stream: expected {expected} bytes, received {received}")]
    EndOfStream { expected: usize, received: usize },

    #[error("Failed to delete paths: {}", .0.join(", "))]
    RemoveFailed(Vec<String>),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Timed out waiting for reply")]
    Timeout,

    #[error("{}", constants::ERR_CONNECTION_CLOSED)]
    ConnectionClosed,

    #[error("{}", constants::ERR_DESYNCHRONIZED)]
    Desynchronized,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Local contract violation tagged with a status code.
    pub fn afc(code: AfcError, message: impl Into<String>) -> Self {
        ProtocolError::Afc {
            code,
            message: message.into(),
        }
    }

    /// Status code carried by this error, when there is one.
    ///
    /// Framing errors report [`AfcError::OperationHeaderInvalid`] so callers
    /// branching on codes see the same value the device would use.
    pub fn code(&self) -> Option<AfcError> {
        match self {
            ProtocolError::Status(code) => Some(*code),
            ProtocolError::Afc { code, .. } => Some(*code),
            ProtocolError::FileNotFound { .. } => Some(AfcError::ObjectNotFound),
            ProtocolError::UnexpectedOperation { .. }
            | ProtocolError::InvalidResponseSize { .. } => Some(AfcError::OperationHeaderInvalid),
            _ => None,
        }
    }

    /// True when the error means the path does not exist on the device.
    pub fn is_not_found(&self) -> bool {
        matches!(self.code(), Some(AfcError::ObjectNotFound))
    }

    /// Framing errors leave the byte stream in an unknown position.
    pub(crate) fn breaks_framing(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(_)
                | ProtocolError::BadMagic
                | ProtocolError::TruncatedHeader(_)
                | ProtocolError::OversizedPacket(_)
                | ProtocolError::ConnectionClosed
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
