//! The byte source the decoder reads from.
//!
//! All decoding happens over an in-memory buffer. [`Cursor`](struct.Cursor.html) is a forward-only
//! view into that buffer which hands out exactly the requested amount of bytes or fails with
//! [`ErrorKind::UnexpectedEndOfData`](../enum.ErrorKind.html#variant.UnexpectedEndOfData),
//! keeping track of its absolute offset so that errors can point at the offending byte.
//!
//! Since slices handed out by the cursor borrow from the original buffer, decoded events can keep
//! their raw bytes without copying.

use crate::prelude::*;

/// A forward-only reader over a byte slice.
///
/// Cloning a cursor is cheap and yields an independent read position over the same bytes.
#[derive(Copy, Clone, Debug)]
pub struct Cursor<'a> {
    /// Starts at the current read position, ends at the end of the source.
    raw: &'a [u8],
    /// Absolute offset of `raw[0]` in the original input.
    pos: usize,
}
impl<'a> Cursor<'a> {
    /// Create a cursor at the start of `raw`.
    #[inline]
    pub fn new(raw: &'a [u8]) -> Cursor<'a> {
        Cursor { raw, pos: 0 }
    }

    /// Create a cursor over `raw`, where `raw` starts at absolute offset `offset` of some larger
    /// input.
    #[inline]
    pub fn with_offset(raw: &'a [u8], offset: usize) -> Cursor<'a> {
        Cursor { raw, pos: offset }
    }

    /// The absolute offset of the next byte to be read.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get the remaining unread bytes.
    #[inline]
    pub fn unread(&self) -> &'a [u8] {
        self.raw
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Look at the next byte without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.raw.first().copied()
    }

    /// Read exactly `len` bytes, or fail without consuming anything.
    pub fn read(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.raw.len() {
            return Err(Error::at(ErrorKind::UnexpectedEndOfData, self.pos + self.raw.len()));
        }
        let (extracted, remainder) = self.raw.split_at(len);
        self.raw = remainder;
        self.pos += len;
        Ok(extracted)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read(1)?[0])
    }

    /// Consume and return everything left in the cursor.
    #[inline]
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = mem::replace(&mut self.raw, &[]);
        self.pos += rest.len();
        rest
    }

    /// The bytes consumed between a previous state of this cursor and now.
    ///
    /// `earlier` must be a copy of this same cursor taken before reading.
    #[inline]
    pub(crate) fn consumed_since(&self, earlier: &Cursor<'a>) -> &'a [u8] {
        let raw: &'a [u8] = earlier.raw;
        &raw[..self.pos - earlier.pos]
    }
}
