//! # Core Wire Components
//!
//! Packet framing, request encoding and reply decoding for AFC.
//!
//! ## Wire Format
//! ```text
//! [Magic(8)] [EntireLength(8)] [ThisLength(8)] [PacketNumber(8)] [Operation(8)] [Payload(N)]
//! ```
//!
//! The magic is big-endian ASCII `CFA6LPAA`; every other field is
//! little-endian. Frames are length-prefixed by `ThisLength`, which lets
//! [`codec::AfcCodec`] frame them over any ordered byte stream.

pub mod codec;
pub mod header;
pub mod opcode;
pub mod request;
pub mod response;
pub mod strings;
