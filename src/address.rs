//! 16-bit addresses.
//!
//! Arithmetic on [`Address`] wraps at the top of the 64KB space the way the
//! CPU's address adders do. Conversions from wider integers are checked and
//! fail with [`MemoryError::OutOfRange`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::memory::MemoryError;

/// Number of addressable bytes.
pub const ADDRESS_SPACE: usize = 0x1_0000;

/// A location in the 64KB address space.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Address(u16);

impl Address {
    pub const ZERO: Address = Address(0x0000);
    pub const MAX: Address = Address(0xFFFF);

    pub const fn new(value: u16) -> Self {
        Address(value)
    }

    /// Builds an address from little-endian bytes as they sit in memory.
    pub const fn from_le_bytes(low: u8, high: u8) -> Self {
        Address(u16::from_le_bytes([low, high]))
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// High byte.
    pub const fn page(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Low byte.
    pub const fn offset_in_page(self) -> u8 {
        self.0 as u8
    }

    pub const fn same_page(self, other: Address) -> bool {
        self.page() == other.page()
    }

    pub const fn wrapping_add(self, n: u16) -> Self {
        Address(self.0.wrapping_add(n))
    }

    pub const fn wrapping_sub(self, n: u16) -> Self {
        Address(self.0.wrapping_sub(n))
    }

    /// Relative-branch arithmetic.
    pub const fn wrapping_offset(self, offset: i8) -> Self {
        Address(self.0.wrapping_add_signed(offset as i16))
    }

    /// `self + n` without wrapping, or `None` past $FFFF.
    pub fn checked_add(self, n: usize) -> Option<Address> {
        let end = self.index().checked_add(n)?;
        u16::try_from(end).ok().map(Address)
    }

    /// Checks that `len` bytes starting here stay inside the address space.
    pub fn check_span(self, len: usize) -> Result<(), MemoryError> {
        let end = self.index().checked_add(len);
        if end.map_or(true, |end| end > ADDRESS_SPACE) {
            Err(MemoryError::OutOfRange {
                start: self.index(),
                len,
            })
        } else {
            Ok(())
        }
    }
}

impl From<u16> for Address {
    fn from(value: u16) -> Self {
        Address(value)
    }
}

impl From<Address> for u16 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl TryFrom<usize> for Address {
    type Error = MemoryError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map(Address)
            .map_err(|_| MemoryError::OutOfRange { start: value, len: 1 })
    }
}

impl TryFrom<u32> for Address {
    type Error = MemoryError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Address::try_from(value as usize)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:04X}", self.0)
    }
}

impl fmt::UpperHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
