//! Fixed-layout building blocks of the file format: big-endian integers, bit-limited integers,
//! variable-length values and the header fields.

use crate::{integer::WideUint, prelude::*};

/// Big-endian integers read straight off a cursor.
pub(crate) trait IntRead: Sized {
    fn read(raw: &mut Cursor) -> Result<Self>;
}
impl IntRead for u8 {
    #[inline]
    fn read(raw: &mut Cursor) -> Result<u8> {
        raw.read_u8()
    }
}
impl IntRead for u16 {
    #[inline]
    fn read(raw: &mut Cursor) -> Result<u16> {
        let b = raw.read(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }
}
impl IntRead for u32 {
    #[inline]
    fn read(raw: &mut Cursor) -> Result<u32> {
        let b = raw.read(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Declares an unsigned integer that only uses the low `$bits` bits of `$inner`.
///
/// The wrapped value never has bits set above `$bits`: lossy conversions mask, checked
/// conversions refuse.
macro_rules! restricted_int {
    {$(#[$attr:meta])* $name:ident : $inner:tt => $bits:expr} => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Default)]
        #[repr(transparent)]
        #[allow(non_camel_case_types)]
        pub struct $name($inner);
        impl $name {
            const MASK: $inner = (1 << $bits) - 1;

            /// All bits set.
            #[inline]
            pub const fn max_value() -> $name {
                $name(Self::MASK)
            }

            /// Keep the low bits of `raw`, discarding the rest.
            #[inline]
            pub const fn new(raw: $inner) -> $name {
                $name(raw & Self::MASK)
            }

            /// `None` if `raw` has any bit set above the allowed width.
            #[inline]
            pub fn try_from(raw: $inner) -> Option<$name> {
                if raw & !Self::MASK == 0 {
                    Some($name(raw))
                } else {
                    None
                }
            }

            #[inline]
            pub fn as_int(self) -> $inner {
                self.0
            }

            /// Checked conversion reporting a range error about `what`.
            #[allow(dead_code)]
            #[inline]
            pub(crate) fn check_int(raw: $inner, what: &'static str) -> StdResult<$name, ErrorKind> {
                match Self::try_from(raw) {
                    Some(int) => Ok(int),
                    None => Err(err_range!(what, raw)),
                }
            }
        }
        impl From<$inner> for $name {
            /// Masks off the high bits, see `new`.
            #[inline]
            fn from(raw: $inner) -> $name {
                $name::new(raw)
            }
        }
        impl From<$name> for $inner {
            #[inline]
            fn from(int: $name) -> $inner {
                int.0
            }
        }
        impl PartialEq<$inner> for $name {
            #[inline]
            fn eq(&self, other: &$inner) -> bool {
                self.0 == *other
            }
        }
        impl PartialOrd<$inner> for $name {
            #[inline]
            fn partial_cmp(&self, other: &$inner) -> Option<core::cmp::Ordering> {
                self.0.partial_cmp(other)
            }
        }
        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}
restricted_int! {
    /// Metrical division of the header, in ticks per quarter note.
    u15: u16 => 15
}
restricted_int! {
    /// Pitch bend amounts, two 7-bit data bytes combined.
    u14: u16 => 14
}
restricted_int! {
    /// MIDI data bytes: notes, velocities, controller values, programs.
    u7: u8 => 7
}
restricted_int! {
    /// Channel numbers, the low nibble of a channel status byte.
    u4: u8 => 4
}
restricted_int! {
    /// SMPTE frame rate codes.
    u2: u8 => 2
}
restricted_int! {
    /// Tempo values, in microseconds per quarter note.
    u24: u32 => 24
}

/// A decoded variable-length quantity, as used by delta-times and event lengths.
///
/// Each byte carries 7 bits of the value, most significant group first, and has its top bit set
/// if more bytes follow.
/// Neither the amount of bytes (the MIDI standard allows at most 4) nor the decoded value is
/// limited. Callers that need a machine integer convert with [`to_u64`](#method.to_u64).
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct VariableLengthValue<'a> {
    /// The decoded value.
    pub value: WideUint,
    /// The exact encoded bytes, continuation bits included.
    pub raw_data: &'a [u8],
}
impl<'a> VariableLengthValue<'a> {
    /// Decode a variable-length value starting at the cursor position.
    ///
    /// Fails with `UnexpectedEndOfData` if the input ends before a byte without the continuation
    /// bit is found. On failure the cursor is left where it was.
    pub fn read(raw: &mut Cursor<'a>) -> Result<VariableLengthValue<'a>> {
        let start = *raw;
        let mut cursor = *raw;
        let mut value = WideUint::default();
        loop {
            let byte = cursor.read_u8()?;
            value.shl_or(7, bit_range(byte, 0..7));
            if bit_range(byte, 7..8) == 0 {
                break;
            }
        }
        *raw = cursor;
        Ok(VariableLengthValue {
            value,
            raw_data: cursor.consumed_since(&start),
        })
    }

    /// The amount of bytes the encoded value took.
    #[inline]
    pub fn length(&self) -> usize {
        self.raw_data.len()
    }

    /// The value as a `u64`, if it fits.
    #[inline]
    pub fn to_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }

    /// The value as a `u64`, or a range error about `what`.
    pub(crate) fn checked_u64(&self, what: &'static str) -> StdResult<u64, ErrorKind> {
        self.to_u64().ok_or_else(|| self.range_err(what))
    }

    /// The value as a `usize`, for use as a byte count.
    pub(crate) fn as_len(&self) -> StdResult<usize, ErrorKind> {
        self.to_u64()
            .and_then(|len| usize::try_from(len).ok())
            .ok_or_else(|| self.range_err("length"))
    }

    fn range_err(&self, what: &'static str) -> ErrorKind {
        //Saturates for values of 127 bits and more
        let value = self
            .value
            .to_u128()
            .and_then(|value| i128::try_from(value).ok())
            .unwrap_or(i128::max_value());
        ErrorKind::Range { what, value }
    }
}

/// Reads a slice represented in the input as a variable-length `len` followed by `len` bytes.
pub(crate) fn read_varlen_slice<'a>(raw: &mut Cursor<'a>) -> Result<&'a [u8]> {
    let pos = raw.position();
    let len = VariableLengthValue::read(raw)
        .context(err_invalid!("failed to read varlen slice length"))?
        .as_len()
        .map_err(|kind| Error::at(kind, pos))?;
    raw.read(len)
}

/// Byte order of a multi-byte quantity.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

/// How the tracks of a file relate to each other, from the header `format` field.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Format {
    /// Format 0: one track holding every channel.
    SingleTrack,
    /// Format 1: simultaneous tracks sharing one timeline.
    ///
    /// Tempo and other global meta events conventionally live in the first track.
    Parallel,
    /// Format 2: independent single-track patterns, one after another.
    Sequential,
}
impl Format {
    pub(crate) fn read(raw: &mut Cursor) -> Result<Format> {
        let pos = raw.position();
        match u16::read(raw)? {
            0 => Ok(Format::SingleTrack),
            1 => Ok(Format::Parallel),
            2 => Ok(Format::Sequential),
            _ => Err(Error::at(err_invalid!("invalid smf format"), pos)),
        }
    }

    /// The value of the header `format` field.
    #[inline]
    pub fn as_int(self) -> u16 {
        match self {
            Format::SingleTrack => 0,
            Format::Parallel => 1,
            Format::Sequential => 2,
        }
    }
}

/// The header `division` field: what a delta-time tick means.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Timing {
    /// Ticks per quarter note.
    ///
    /// The wall-clock length of a quarter note comes from [`SetTempo`](struct.SetTempo.html)
    /// events, 120 BPM until the first one.
    Metrical(u15),
    /// Frames per second and ticks per frame, making ticks an absolute duration.
    Timecode(Fps, u8),
}
impl Timing {
    pub(crate) fn read(raw: &mut Cursor) -> Result<Timing> {
        let pos = raw.position();
        let division =
            u16::read(raw).context(err_invalid!("unexpected eof when reading midi timing"))?;
        if bit_range(division, 15..16) == 0 {
            return Ok(Timing::Metrical(u15::new(division)));
        }
        //The high byte holds the negated frame rate
        let [fps, ticks] = division.to_be_bytes();
        let fps = Fps::from_int((fps as i8).wrapping_neg() as u8)
            .ok_or_else(|| Error::at(err_invalid!("invalid smpte fps"), pos))?;
        Ok(Timing::Timecode(fps, ticks))
    }
}

/// SMPTE frame rates.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Fps {
    Fps24,
    Fps25,
    /// Drop-frame 30, ie. `30 / 1.001` frames per second.
    Fps29,
    Fps30,
}
impl Fps {
    /// Map the 2-bit rate code of an SMPTE offset: `0..=3` is 24, 25, 29.97 and 30 fps.
    pub(crate) fn from_code(code: u2) -> Fps {
        match code.as_int() {
            0 => Fps::Fps24,
            1 => Fps::Fps25,
            2 => Fps::Fps29,
            _ => Fps::Fps30,
        }
    }

    /// Map a nominal frame rate (`24`, `25`, `29` or `30`).
    #[inline]
    pub fn from_int(fps: u8) -> Option<Fps> {
        match fps {
            24 => Some(Fps::Fps24),
            25 => Some(Fps::Fps25),
            29 => Some(Fps::Fps29),
            30 => Some(Fps::Fps30),
            _ => None,
        }
    }

    /// The nominal frame rate, `29` for drop-frame.
    #[inline]
    pub fn as_int(self) -> u8 {
        match self {
            Fps::Fps24 => 24,
            Fps::Fps25 => 25,
            Fps::Fps29 => 29,
            Fps::Fps30 => 30,
        }
    }

    /// The exact frame rate.
    #[inline]
    pub fn as_f32(self) -> f32 {
        match self {
            Fps::Fps29 => 30.0 / 1.001,
            fps => fps.as_int() as f32,
        }
    }
}
impl From<Fps> for u8 {
    #[inline]
    fn from(fps: Fps) -> u8 {
        fps.as_int()
    }
}
