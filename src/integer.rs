//! Interpretation of raw byte runs as unsigned integers.
//!
//! MIDI data is full of multi-byte fields whose width is only known at runtime (meta event
//! payloads, sequencer specific data, etc...). [`IntBuilder`](struct.IntBuilder.html) reads such a
//! run both as a big-endian and as a little-endian number, and classifies it into the smallest
//! machine integer it fits in.

use crate::prelude::*;

/// An unsigned integer of arbitrary width.
///
/// Stored as base-256 digits, least significant first, without high zero digits.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct WideUint {
    digits: Vec<u8>,
}
impl WideUint {
    /// Build an integer from bytes ordered most significant first.
    ///
    /// For every byte the accumulator is shifted left by 8 bits and the byte is OR-ed in.
    pub fn from_be_bytes(bytes: &[u8]) -> WideUint {
        let mut int = WideUint::default();
        for &byte in bytes {
            int.shl8_or(byte);
        }
        int.trim();
        int
    }

    /// Build an integer from bytes ordered least significant first.
    ///
    /// The byte at index `i` is shifted left by `8 * i` bits and OR-ed into the accumulator.
    pub fn from_le_bytes(bytes: &[u8]) -> WideUint {
        let mut int = WideUint::default();
        for (i, &byte) in bytes.iter().enumerate() {
            int.or_shifted(byte, i);
        }
        int.trim();
        int
    }

    fn shl8_or(&mut self, byte: u8) {
        self.digits.insert(0, byte);
    }

    /// Shift left by `shift` bits (at most 8) and OR `bits` into the freed low bits.
    ///
    /// `bits` must fit in `shift` bits. Keeps the digits trimmed.
    pub(crate) fn shl_or(&mut self, shift: u32, bits: u8) {
        let mut carry = bits as u16;
        for digit in self.digits.iter_mut() {
            let wide = (*digit as u16) << shift | carry;
            *digit = wide as u8;
            carry = wide >> 8;
        }
        if carry != 0 {
            self.digits.push(carry as u8);
        }
    }

    fn or_shifted(&mut self, byte: u8, digit: usize) {
        if self.digits.len() <= digit {
            self.digits.resize(digit + 1, 0);
        }
        self.digits[digit] |= byte;
    }

    fn trim(&mut self) {
        while self.digits.last() == Some(&0) {
            self.digits.pop();
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    /// The amount of significant bits, `0` for zero.
    pub fn bit_len(&self) -> usize {
        match self.digits.last() {
            Some(top) => (self.digits.len() - 1) * 8 + (8 - top.leading_zeros() as usize),
            None => 0,
        }
    }

    /// The minimal big-endian byte representation (empty for zero).
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.digits.iter().rev().copied().collect()
    }

    /// The value as a `u64`, if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        self.to_u128().and_then(|int| u64::try_from(int).ok())
    }

    /// The value as a `u128`, if it fits.
    pub fn to_u128(&self) -> Option<u128> {
        if self.digits.len() > mem::size_of::<u128>() {
            return None;
        }
        Some(
            self.digits
                .iter()
                .rev()
                .fold(0, |acc, &digit| acc << 8 | digit as u128),
        )
    }
}
impl From<u128> for WideUint {
    fn from(int: u128) -> WideUint {
        WideUint::from_be_bytes(&int.to_be_bytes())
    }
}
impl From<u64> for WideUint {
    fn from(int: u64) -> WideUint {
        WideUint::from_be_bytes(&int.to_be_bytes())
    }
}
impl PartialEq<u64> for WideUint {
    fn eq(&self, rhs: &u64) -> bool {
        self.to_u64() == Some(*rhs)
    }
}
impl PartialEq<u128> for WideUint {
    fn eq(&self, rhs: &u128) -> bool {
        self.to_u128() == Some(*rhs)
    }
}
impl fmt::Display for WideUint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        //Schoolbook division by 10, one decimal digit per pass
        let mut digits = self.digits.clone();
        let mut decimal = Vec::with_capacity(digits.len() * 3 + 1);
        while !digits.is_empty() {
            let mut rem: u16 = 0;
            for digit in digits.iter_mut().rev() {
                let cur = rem << 8 | *digit as u16;
                *digit = (cur / 10) as u8;
                rem = cur % 10;
            }
            decimal.push(b'0' + rem as u8);
            while digits.last() == Some(&0) {
                digits.pop();
            }
        }
        if decimal.is_empty() {
            decimal.push(b'0');
        }
        decimal.reverse();
        f.pad_integral(
            true,
            "",
            core::str::from_utf8(&decimal).map_err(|_| fmt::Error)?,
        )
    }
}
impl fmt::LowerHex for WideUint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut digits = self.digits.iter().rev();
        let mut hex = match digits.next() {
            Some(top) => format!("{:x}", top),
            None => String::from("0"),
        };
        for digit in digits {
            hex.push_str(&format!("{:02x}", digit));
        }
        f.pad_integral(true, "0x", &hex)
    }
}
impl fmt::Debug for WideUint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// The machine integer class a byte run fits in.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum CType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}
impl CType {
    /// Classify a byte run by its length in bytes.
    ///
    /// `1 => UInt8`, `2 => UInt16`, `3..=4 => UInt32`, `5..=8 => UInt64`, anything else (including
    /// zero) is unclassified.
    pub fn from_byte_length(byte_length: usize) -> Option<CType> {
        Some(match byte_length {
            1 => CType::UInt8,
            2 => CType::UInt16,
            3..=4 => CType::UInt32,
            5..=8 => CType::UInt64,
            _ => return None,
        })
    }

    /// The width of this integer class in bits.
    pub fn bits(self) -> u32 {
        match self {
            CType::UInt8 => 8,
            CType::UInt16 => 16,
            CType::UInt32 => 32,
            CType::UInt64 => 64,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CType::UInt8 => "uint8",
            CType::UInt16 => "uint16",
            CType::UInt32 => "uint32",
            CType::UInt64 => "uint64",
        }
    }
}
impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Both integer interpretations of a non-empty byte run.
///
/// The two interpretations are computed independently. Runs wider than 8 bytes are left
/// unclassified but still hold both values.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct IntBuilder {
    /// The bytes the integers were built from.
    pub original_data: Vec<u8>,
    pub byte_length: usize,
    pub big_endian: WideUint,
    pub little_endian: WideUint,
    pub c_type: Option<CType>,
}
impl IntBuilder {
    /// Interpret `bytes` as integers.
    ///
    /// Fails with `ErrorKind::EmptyInteger` if `bytes` is empty.
    pub fn new(bytes: &[u8]) -> Result<IntBuilder> {
        ensure!(!bytes.is_empty(), ErrorKind::EmptyInteger);
        Ok(IntBuilder {
            original_data: bytes.to_vec(),
            byte_length: bytes.len(),
            big_endian: WideUint::from_be_bytes(bytes),
            little_endian: WideUint::from_le_bytes(bytes),
            c_type: CType::from_byte_length(bytes.len()),
        })
    }
}
/// Prints `"<le>LE : <be>BE : 0x<raw>B"`, where `<raw>` is every original byte in hex, without
/// padding.
impl fmt::Display for IntBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}LE : {}BE : 0x", self.little_endian, self.big_endian)?;
        for byte in &self.original_data {
            write!(f, "{:x}", byte)?;
        }
        f.write_str("B")
    }
}
