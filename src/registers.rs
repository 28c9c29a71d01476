//! Program counter and processor status register.
//!
//! The status register packs the flags as `NV1BDIZC`. Bit 5 always reads
//! as 1. There is no B flip-flop in the chip: B only exists in the copy
//! pushed to the stack (set by BRK/PHP, clear for IRQ/NMI) and is dropped
//! again when the byte is pulled.

use std::fmt;

/// A single status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Carry,
    Zero,
    InterruptDisable,
    Decimal,
    Break,
    Unused,
    Overflow,
    Negative,
}

impl Flag {
    pub const fn mask(self) -> u8 {
        match self {
            Flag::Carry => 0x01,
            Flag::Zero => 0x02,
            Flag::InterruptDisable => 0x04,
            Flag::Decimal => 0x08,
            Flag::Break => 0x10,
            Flag::Unused => 0x20,
            Flag::Overflow => 0x40,
            Flag::Negative => 0x80,
        }
    }
}

/// The P register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRegister(u8);

impl StatusRegister {
    /// Power-on value: I set, bit 5 set.
    pub const fn new() -> Self {
        StatusRegister(Flag::Unused.mask() | Flag::InterruptDisable.mask())
    }

    /// Builds the register from a byte pulled off the stack.
    pub const fn from_pulled(value: u8) -> Self {
        StatusRegister((value & !Flag::Break.mask()) | Flag::Unused.mask())
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Byte pushed by BRK and PHP.
    pub const fn pushed_by_software(self) -> u8 {
        self.0 | Flag::Break.mask() | Flag::Unused.mask()
    }

    /// Byte pushed when servicing IRQ or NMI.
    pub const fn pushed_by_hardware(self) -> u8 {
        (self.0 & !Flag::Break.mask()) | Flag::Unused.mask()
    }

    pub fn get(self, flag: Flag) -> bool {
        self.0 & flag.mask() != 0
    }

    pub fn set(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::Break | Flag::Unused => {}
            _ if value => self.0 |= flag.mask(),
            _ => self.0 &= !flag.mask(),
        }
    }

    /// Sets Z and N from a result byte.
    pub fn update_zn(&mut self, value: u8) {
        self.set(Flag::Zero, value == 0);
        self.set(Flag::Negative, value & 0x80 != 0);
    }

    pub fn carry(self) -> bool {
        self.get(Flag::Carry)
    }

    pub fn zero(self) -> bool {
        self.get(Flag::Zero)
    }

    pub fn interrupt_disable(self) -> bool {
        self.get(Flag::InterruptDisable)
    }

    pub fn decimal(self) -> bool {
        self.get(Flag::Decimal)
    }

    pub fn overflow(self) -> bool {
        self.get(Flag::Overflow)
    }

    pub fn negative(self) -> bool {
        self.get(Flag::Negative)
    }
}

impl Default for StatusRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StatusRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Flag, char); 8] = [
            (Flag::Negative, 'N'),
            (Flag::Overflow, 'V'),
            (Flag::Unused, '-'),
            (Flag::Break, 'B'),
            (Flag::Decimal, 'D'),
            (Flag::InterruptDisable, 'I'),
            (Flag::Zero, 'Z'),
            (Flag::Carry, 'C'),
        ];
        for (flag, name) in NAMES {
            let c = if self.get(flag) { name } else { '.' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// The 16-bit program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgramCounter(u16);

impl ProgramCounter {
    pub const fn new(value: u16) -> Self {
        ProgramCounter(value)
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub fn set(&mut self, value: u16) {
        self.0 = value;
    }

    /// Returns the current value and moves past one byte.
    pub fn take(&mut self) -> u16 {
        let at = self.0;
        self.0 = self.0.wrapping_add(1);
        at
    }

    pub fn advance(&mut self, n: u16) {
        self.0 = self.0.wrapping_add(n);
    }

    pub const fn high(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn low(self) -> u8 {
        self.0 as u8
    }
}
