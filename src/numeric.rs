//! # Numeric Primitives
//!
//! Byte-level value types and the arithmetic the 6502 ALU performs on them.
//!
//! - [`UByte`]: a single byte with bit helpers and packed-decimal checks
//! - [`UBytes`]: an ordered byte sequence (memory dumps, multi-byte operands)
//! - [`UInt`]: a little-endian multi-byte integer in [`Format::Binary`] or
//!   [`Format::PackedDecimal`] encoding
//!
//! [`add_with_carry`] and [`subtract_with_borrow`] reproduce the NMOS flag
//! results exactly, including decimal mode with non-decimal nibbles:
//!
//! ```
//! use mos_machine::numeric::{add_with_carry, Format};
//!
//! let r = add_with_carry(0x19, 0x01, false, Format::PackedDecimal);
//! assert_eq!(r.value, 0x20);
//! assert!(!r.carry);
//! ```

use std::fmt;

/// Encoding used when a byte sequence is interpreted as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Plain two's-complement binary.
    #[default]
    Binary,
    /// Two decimal digits per byte (BCD), high digit in the upper nibble.
    PackedDecimal,
}

/// A single 8-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UByte(u8);

impl UByte {
    pub const ZERO: UByte = UByte(0x00);
    pub const MAX: UByte = UByte(0xFF);

    pub const fn new(value: u8) -> Self {
        UByte(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns bit `n` (0 = least significant).
    pub fn bit(self, n: u8) -> bool {
        debug_assert!(n < 8);
        self.0 & (1 << n) != 0
    }

    pub fn with_bit(self, n: u8, set: bool) -> Self {
        debug_assert!(n < 8);
        if set {
            UByte(self.0 | (1 << n))
        } else {
            UByte(self.0 & !(1 << n))
        }
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Bit 7 set.
    pub fn is_negative(self) -> bool {
        self.0 & 0x80 != 0
    }

    /// Shift left one bit. Returns the result and the bit shifted out.
    pub fn shift_left(self) -> (UByte, bool) {
        (UByte(self.0 << 1), self.bit(7))
    }

    /// Logical shift right one bit. Returns the result and the bit shifted out.
    pub fn shift_right(self) -> (UByte, bool) {
        (UByte(self.0 >> 1), self.bit(0))
    }

    /// Rotate left through carry.
    pub fn rotate_left(self, carry_in: bool) -> (UByte, bool) {
        (UByte((self.0 << 1) | carry_in as u8), self.bit(7))
    }

    /// Rotate right through carry.
    pub fn rotate_right(self, carry_in: bool) -> (UByte, bool) {
        (UByte((self.0 >> 1) | ((carry_in as u8) << 7)), self.bit(0))
    }

    pub fn low_nibble(self) -> u8 {
        self.0 & 0x0F
    }

    pub fn high_nibble(self) -> u8 {
        self.0 >> 4
    }

    /// True when both nibbles are decimal digits (0-9).
    pub fn is_valid_decimal(self) -> bool {
        self.low_nibble() <= 9 && self.high_nibble() <= 9
    }

    /// Encodes `0..=99` as a packed-decimal byte.
    pub fn from_decimal(value: u8) -> Option<UByte> {
        (value <= 99).then(|| UByte(((value / 10) << 4) | (value % 10)))
    }

    /// Decodes a packed-decimal byte. `None` if either nibble is above 9.
    pub fn to_decimal(self) -> Option<u8> {
        self.is_valid_decimal()
            .then(|| self.high_nibble() * 10 + self.low_nibble())
    }
}

impl From<u8> for UByte {
    fn from(value: u8) -> Self {
        UByte(value)
    }
}

impl From<UByte> for u8 {
    fn from(value: UByte) -> Self {
        value.0
    }
}

impl fmt::Display for UByte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:02X}", self.0)
    }
}

/// Outcome of an ALU operation with the flags it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArithResult {
    pub value: u8,
    pub carry: bool,
    pub zero: bool,
    pub negative: bool,
    pub overflow: bool,
}

/// ADC: `a + b + carry` in the given format.
///
/// In decimal mode the NMOS part computes Z from the binary sum and N/V from
/// the intermediate result taken after the low-digit adjust but before the
/// high-digit adjust. Non-decimal nibbles go through the same steps, so the
/// results match hardware for every input.
pub fn add_with_carry(a: u8, b: u8, carry: bool, format: Format) -> ArithResult {
    let c = carry as u16;
    let (a16, b16) = (a as u16, b as u16);
    let binary = a16 + b16 + c;

    match format {
        Format::Binary => {
            let value = binary as u8;
            ArithResult {
                value,
                carry: binary > 0xFF,
                zero: value == 0,
                negative: value & 0x80 != 0,
                overflow: (!(a ^ b) & (a ^ value) & 0x80) != 0,
            }
        }
        Format::PackedDecimal => {
            let mut low = (a16 & 0x0F) + (b16 & 0x0F) + c;
            if low > 0x09 {
                low += 0x06;
            }
            let mut sum = if low <= 0x0F {
                (low & 0x0F) + (a16 & 0xF0) + (b16 & 0xF0)
            } else {
                (low & 0x0F) + (a16 & 0xF0) + (b16 & 0xF0) + 0x10
            };
            let negative = sum & 0x80 != 0;
            let overflow = ((a16 ^ sum) & 0x80) != 0 && ((a16 ^ b16) & 0x80) == 0;
            if (sum & 0x1F0) > 0x90 {
                sum += 0x60;
            }
            ArithResult {
                value: sum as u8,
                carry: (sum & 0xFF0) > 0xF0,
                zero: binary & 0xFF == 0,
                negative,
                overflow,
            }
        }
    }
}

/// SBC: `a - b - !carry` in the given format.
///
/// On NMOS parts every flag comes from the binary subtraction; only the
/// accumulator result is decimal-adjusted.
pub fn subtract_with_borrow(a: u8, b: u8, carry: bool, format: Format) -> ArithResult {
    let borrow = (!carry) as u16;
    let (a16, b16) = (a as u16, b as u16);
    let binary = a16.wrapping_sub(b16).wrapping_sub(borrow);
    let binary_value = binary as u8;

    let value = match format {
        Format::Binary => binary_value,
        Format::PackedDecimal => {
            let low = (a16 & 0x0F).wrapping_sub(b16 & 0x0F).wrapping_sub(borrow);
            let mut result = if low & 0x10 != 0 {
                (low.wrapping_sub(0x06) & 0x0F)
                    | (a16 & 0xF0).wrapping_sub(b16 & 0xF0).wrapping_sub(0x10)
            } else {
                (low & 0x0F) | (a16 & 0xF0).wrapping_sub(b16 & 0xF0)
            };
            if result & 0x100 != 0 {
                result = result.wrapping_sub(0x60);
            }
            result as u8
        }
    };

    ArithResult {
        value,
        carry: binary < 0x100,
        zero: binary_value == 0,
        negative: binary_value & 0x80 != 0,
        overflow: ((a ^ b) & (a ^ binary_value) & 0x80) != 0,
    }
}

/// CMP/CPX/CPY: flags of `register - value` without storing it.
pub fn compare(register: u8, value: u8) -> ArithResult {
    let diff = register.wrapping_sub(value);
    ArithResult {
        value: diff,
        carry: register >= value,
        zero: register == value,
        negative: diff & 0x80 != 0,
        overflow: false,
    }
}

/// An ordered sequence of bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UBytes(Vec<UByte>);

impl UBytes {
    pub fn new(bytes: Vec<UByte>) -> Self {
        UBytes(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<UByte> {
        self.0.get(index).copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = UByte> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.iter().map(|b| b.value()).collect()
    }
}

impl From<&[u8]> for UBytes {
    fn from(bytes: &[u8]) -> Self {
        UBytes(bytes.iter().copied().map(UByte::new).collect())
    }
}

impl From<Vec<u8>> for UBytes {
    fn from(bytes: Vec<u8>) -> Self {
        UBytes::from(bytes.as_slice())
    }
}

impl fmt::Display for UBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte.value())?;
        }
        Ok(())
    }
}

/// Largest `UInt` width, in bytes.
pub const UINT_MAX_WIDTH: usize = 8;

/// A little-endian unsigned integer of 1 to 8 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UInt {
    bytes: UBytes,
    format: Format,
}

impl UInt {
    /// Wraps raw little-endian bytes. Returns `None` for an empty or
    /// over-wide sequence.
    pub fn from_bytes(bytes: UBytes, format: Format) -> Option<Self> {
        (!bytes.is_empty() && bytes.len() <= UINT_MAX_WIDTH).then_some(UInt { bytes, format })
    }

    /// Encodes `value` into `width` bytes. Returns `None` if it doesn't fit.
    pub fn from_value(value: u64, width: usize, format: Format) -> Option<Self> {
        if width == 0 || width > UINT_MAX_WIDTH {
            return None;
        }
        let mut bytes = Vec::with_capacity(width);
        let mut rest = value;
        for _ in 0..width {
            let byte = match format {
                Format::Binary => {
                    let b = rest as u8;
                    rest >>= 8;
                    b
                }
                Format::PackedDecimal => {
                    let b = UByte::from_decimal((rest % 100) as u8)?.value();
                    rest /= 100;
                    b
                }
            };
            bytes.push(UByte::new(byte));
        }
        (rest == 0).then_some(UInt { bytes: UBytes(bytes), format })
    }

    /// Numeric value. `None` for a packed-decimal value holding a non-decimal
    /// nibble.
    pub fn value(&self) -> Option<u64> {
        self.bytes.iter().rev().try_fold(0u64, |acc, byte| match self.format {
            Format::Binary => Some((acc << 8) | byte.value() as u64),
            Format::PackedDecimal => Some(acc * 100 + byte.to_decimal()? as u64),
        })
    }

    pub fn width(&self) -> usize {
        self.bytes.len()
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn bytes(&self) -> &UBytes {
        &self.bytes
    }

    /// Byte-by-byte add with carry propagation, wrapping at the width.
    /// Returns the sum and the carry out of the top byte.
    pub fn wrapping_add(&self, other: &UInt) -> (UInt, bool) {
        let mut carry = false;
        let mut out = Vec::with_capacity(self.width());
        for i in 0..self.width() {
            let a = self.bytes.get(i).map_or(0, UByte::value);
            let b = other.bytes.get(i).map_or(0, UByte::value);
            let r = add_with_carry(a, b, carry, self.format);
            carry = r.carry;
            out.push(UByte::new(r.value));
        }
        (
            UInt {
                bytes: UBytes(out),
                format: self.format,
            },
            carry,
        )
    }
}

impl fmt::Display for UInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.format, self.value()) {
            (Format::PackedDecimal, Some(v)) => write!(f, "{}", v),
            _ => {
                f.write_str("$")?;
                for byte in self.bytes.iter().rev() {
                    write!(f, "{:02X}", byte.value())?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_add_overflow() {
        let r = add_with_carry(0x50, 0x50, false, Format::Binary);
        assert_eq!(r.value, 0xA0);
        assert!(r.overflow);
        assert!(r.negative);
        assert!(!r.carry);
    }

    #[test]
    fn test_binary_add_carry_out() {
        let r = add_with_carry(0xFF, 0x01, false, Format::Binary);
        assert_eq!(r.value, 0x00);
        assert!(r.carry);
        assert!(r.zero);
        assert!(!r.overflow);
    }

    #[test]
    fn test_decimal_add_digit_carry() {
        let r = add_with_carry(0x19, 0x01, false, Format::PackedDecimal);
        assert_eq!(r.value, 0x20);
        assert!(!r.carry);
    }

    #[test]
    fn test_decimal_add_wraps_to_zero_with_nmos_flags() {
        let r = add_with_carry(0x99, 0x01, false, Format::PackedDecimal);
        assert_eq!(r.value, 0x00);
        assert!(r.carry);
        // Z follows the binary sum (0x9A), N the intermediate (0xA0)
        assert!(!r.zero);
        assert!(r.negative);
    }

    #[test]
    fn test_decimal_add_invalid_nibble() {
        let r = add_with_carry(0x0F, 0x01, false, Format::PackedDecimal);
        assert_eq!(r.value, 0x16);
        assert!(!r.carry);
    }

    #[test]
    fn test_decimal_sub_borrow_digit() {
        let r = subtract_with_borrow(0x20, 0x01, true, Format::PackedDecimal);
        assert_eq!(r.value, 0x19);
        assert!(r.carry);
    }

    #[test]
    fn test_decimal_sub_underflow() {
        let r = subtract_with_borrow(0x00, 0x01, true, Format::PackedDecimal);
        assert_eq!(r.value, 0x99);
        assert!(!r.carry);
        assert!(r.negative);
    }

    #[test]
    fn test_binary_sub_overflow() {
        let r = subtract_with_borrow(0x80, 0x01, true, Format::Binary);
        assert_eq!(r.value, 0x7F);
        assert!(r.overflow);
        assert!(r.carry);
    }

    #[test]
    fn test_compare_flags() {
        let r = compare(0x40, 0x40);
        assert!(r.zero && r.carry && !r.negative);
        let r = compare(0x10, 0x20);
        assert!(!r.carry && r.negative);
    }

    #[test]
    fn test_ubyte_rotates() {
        let (v, c) = UByte::new(0x81).rotate_left(false);
        assert_eq!((v.value(), c), (0x02, true));
        let (v, c) = UByte::new(0x01).rotate_right(true);
        assert_eq!((v.value(), c), (0x80, true));
    }

    #[test]
    fn test_packed_decimal_conversion() {
        assert_eq!(UByte::from_decimal(42), Some(UByte::new(0x42)));
        assert_eq!(UByte::from_decimal(100), None);
        assert_eq!(UByte::new(0x3A).to_decimal(), None);
    }

    #[test]
    fn test_uint_decimal_value_and_add() {
        let a = UInt::from_value(1999, 2, Format::PackedDecimal).unwrap();
        assert_eq!(a.bytes().to_vec(), vec![0x99, 0x19]);
        let one = UInt::from_value(1, 2, Format::PackedDecimal).unwrap();
        let (sum, carry) = a.wrapping_add(&one);
        assert_eq!(sum.value(), Some(2000));
        assert!(!carry);
        assert_eq!(sum.to_string(), "2000");
    }

    #[test]
    fn test_uint_binary_overflow_rejected() {
        assert!(UInt::from_value(0x1_0000, 2, Format::Binary).is_none());
        let v = UInt::from_value(0xBEEF, 2, Format::Binary).unwrap();
        assert_eq!(v.to_string(), "$BEEF");
    }

    #[test]
    fn test_ubytes_display() {
        let bytes = UBytes::from(&[0x01u8, 0xAB][..]);
        assert_eq!(bytes.to_string(), "01 AB");
    }
}
