//! Error types for the protocol layer.
//!
//! Every variant here is fatal for the connection that produced the bytes:
//! once a peer has sent something we can't frame or decode, the two sides
//! no longer agree on where the next packet starts.

use crate::PacketKind;

/// Errors that can occur while framing or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The type tag doesn't name any known packet kind.
    ///
    /// Client and server must embed the same registry; there is no version
    /// negotiation, so an unknown tag means the peers have desynced.
    #[error("unknown packet type tag {0}")]
    UnknownPacketType(u8),

    /// An entity type byte outside the known set.
    #[error("unknown entity type tag {0}")]
    UnknownEntityType(u8),

    /// A read needed more bytes than the payload had left.
    #[error("unexpected end of payload: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd {
        /// Bytes the read required.
        needed: usize,
        /// Bytes still available.
        remaining: usize,
    },

    /// The payload decoded but left bytes behind, so the schema didn't match.
    #[error("{remaining} trailing bytes after {kind} payload")]
    TrailingBytes {
        /// The packet kind that was decoded.
        kind: PacketKind,
        /// Bytes left unread.
        remaining: usize,
    },

    /// The frame header declares a size that doesn't match the bytes we have.
    #[error("frame size mismatch: header declares {declared} bytes, {actual} available")]
    FrameSizeMismatch {
        /// Size from the header (header included).
        declared: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The declared frame size can't even hold the header.
    #[error("frame size {0} is smaller than the frame header")]
    FrameTooSmall(usize),

    /// The frame exceeds the maximum frame size.
    #[error("frame size {size} exceeds maximum {max}")]
    FrameTooLarge {
        /// Offending size.
        size: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A string field didn't contain valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidString(#[source] std::string::FromUtf8Error),
}
