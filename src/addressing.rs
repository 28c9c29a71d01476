//! # Addressing Modes
//!
//! How an instruction finds its operand. The mode fixes how many operand
//! bytes follow the opcode and which index register (if any) takes part in
//! the effective-address calculation.

/// 6502 addressing mode.
///
/// # Operand bytes
///
/// - **0**: Implicit, Accumulator
/// - **1**: Immediate, ZeroPage, ZeroPageX, ZeroPageY, Relative, IndirectX, IndirectY
/// - **2**: Absolute, AbsoluteX, AbsoluteY, Indirect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// No operand (CLC, RTS, NOP).
    Implicit,

    /// The accumulator is the operand (ASL A).
    Accumulator,

    /// `#$nn`.
    Immediate,

    /// `$nn`.
    ZeroPage,

    /// `$nn,X`, wrapping within page zero.
    ZeroPageX,

    /// `$nn,Y`, wrapping within page zero.
    ZeroPageY,

    /// Signed branch displacement from the next instruction.
    Relative,

    /// `$nnnn`.
    Absolute,

    /// `$nnnn,X`. Reads pay a cycle when the index crosses a page.
    AbsoluteX,

    /// `$nnnn,Y`. Reads pay a cycle when the index crosses a page.
    AbsoluteY,

    /// `($nnnn)`, JMP only. The pointer's high byte is fetched from the
    /// same page as its low byte, so `JMP ($10FF)` reads $10FF and $1000.
    Indirect,

    /// `($nn,X)`: pointer at zero page `nn + X`.
    IndirectX,

    /// `($nn),Y`: pointer at zero page `nn`, then `+ Y`. Reads pay a cycle
    /// on a page cross.
    IndirectY,
}

impl AddressingMode {
    /// Bytes following the opcode.
    pub const fn operand_len(self) -> u8 {
        use AddressingMode::*;
        match self {
            Implicit | Accumulator => 0,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | Relative | IndirectX | IndirectY => 1,
            Absolute | AbsoluteX | AbsoluteY | Indirect => 2,
        }
    }

    /// Modes whose effective address depends on X or Y after the base
    /// address is known, and can therefore cross a page.
    pub const fn is_indexed_absolute(self) -> bool {
        matches!(
            self,
            AddressingMode::AbsoluteX | AddressingMode::AbsoluteY | AddressingMode::IndirectY
        )
    }
}
