//! Byte-level read/write primitives and the frame envelope.
//!
//! Every packet on either channel travels as one frame:
//!
//! ```text
//! +---------------------+-------------+------------------+
//! | total size (4 B)    | type tag    | payload          |
//! | u32 big-endian      | u8          | (size - 5) bytes |
//! +---------------------+-------------+------------------+
//! ```
//!
//! The size counts the 5 header bytes. Inside the payload, integers are
//! big-endian and fixed width, and strings and blobs carry a `u32` length
//! prefix.
//!
//! Strings have one sharp edge: the writer is given a *declared* length and
//! emits exactly that many bytes, truncating or padding with NUL. Readers
//! stop at the first NUL and skip whatever is left of the declared length.

use crate::ProtocolError;

/// Size of the frame header: `u32` size plus `u8` tag.
pub const HEADER_LEN: usize = 5;

/// Upper bound for a single frame on either channel (about 10 MB).
pub const MAX_FRAME_SIZE: usize = 1024 * 100 * 100;

// ---------------------------------------------------------------------------
// PacketWriter
// ---------------------------------------------------------------------------

/// Appends big-endian fields to a growable buffer.
#[derive(Debug, Default, Clone)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// One byte, `1` for true.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Writes `value` as a string field of exactly `declared_len` bytes.
    ///
    /// Longer values are truncated (at a character boundary, with the gap
    /// NUL-filled); shorter values are NUL-padded. Pass the value's own
    /// length, or use [`write_str`](Self::write_str), when the field is
    /// meant to be variable length.
    pub fn write_string(&mut self, value: &str, declared_len: u32) {
        let declared = declared_len as usize;
        self.write_u32(declared_len);

        let mut cut = value.len().min(declared);
        while !value.is_char_boundary(cut) {
            cut -= 1;
        }
        self.buf.extend_from_slice(&value.as_bytes()[..cut]);
        self.buf.resize(self.buf.len() + (declared - cut), 0);
    }

    /// Writes a string field whose declared length is the value's length.
    pub fn write_str(&mut self, value: &str) {
        let len = u32::try_from(value.len()).unwrap_or(u32::MAX);
        self.write_string(value, len);
    }

    /// Writes a `u32` length followed by the raw bytes.
    pub fn write_blob(&mut self, data: &[u8]) {
        let len = u32::try_from(data.len()).unwrap_or(u32::MAX);
        self.write_u32(len);
        self.buf.extend_from_slice(&data[..len as usize]);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// PacketReader
// ---------------------------------------------------------------------------

/// Cursor over a payload. Every read is bounds-checked; running off the
/// end is a [`ProtocolError::UnexpectedEnd`], never a panic.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(ProtocolError::UnexpectedEnd {
                needed: n,
                remaining,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.take_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a string field. Stops at the first NUL; the rest of the
    /// declared bytes are consumed and discarded.
    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let declared = self.read_u32()? as usize;
        let bytes = self.take(declared)?;
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        String::from_utf8(bytes[..end].to_vec())
            .map_err(ProtocolError::InvalidString)
    }

    pub fn read_blob(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Wraps a payload in the `size | tag` header.
///
/// # Errors
/// [`ProtocolError::FrameTooLarge`] if the frame would exceed
/// [`MAX_FRAME_SIZE`].
pub fn encode_frame(tag: u8, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let size = HEADER_LEN + payload.len();
    if size > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(size);
    frame.extend_from_slice(&(size as u32).to_be_bytes());
    frame.push(tag);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Validates the size prefix of a frame and returns it as a byte count.
///
/// Stream readers use this after reading the first four bytes to learn
/// how much more to read.
pub fn frame_size_from_header(prefix: [u8; 4]) -> Result<usize, ProtocolError> {
    let size = u32::from_be_bytes(prefix) as usize;
    if size < HEADER_LEN {
        return Err(ProtocolError::FrameTooSmall(size));
    }
    if size > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(size)
}

/// Splits a complete frame into its tag and payload.
///
/// # Errors
/// The declared size must equal `frame.len()` exactly; anything else is a
/// [`ProtocolError::FrameSizeMismatch`] and the connection is unusable.
pub fn decode_frame(frame: &[u8]) -> Result<(u8, &[u8]), ProtocolError> {
    if frame.len() < HEADER_LEN {
        return Err(ProtocolError::UnexpectedEnd {
            needed: HEADER_LEN,
            remaining: frame.len(),
        });
    }
    let declared = frame_size_from_header([frame[0], frame[1], frame[2], frame[3]])?;
    if declared != frame.len() {
        return Err(ProtocolError::FrameSizeMismatch {
            declared,
            actual: frame.len(),
        });
    }
    Ok((frame[4], &frame[HEADER_LEN..]))
}

// =========================================================================
// Tests
// =========================================================================
