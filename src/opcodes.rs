//! # Opcode Table
//!
//! All 256 NMOS 6502 opcodes: the 151 documented instructions, the
//! undocumented ones that real machines rely on, and the JAM codes that lock
//! the processor.
//!
//! Each entry carries the mnemonic, addressing mode and base cycle count.
//! Reads through an indexed mode that cross a page pay one extra cycle when
//! `page_penalty` is set. Branches add their own cycles at run time.
//!
//! ```
//! use mos_machine::opcodes::{Mnemonic, OPCODE_TABLE};
//! use mos_machine::AddressingMode;
//!
//! let lda = &OPCODE_TABLE[0xA9];
//! assert_eq!(lda.mnemonic, Mnemonic::Lda);
//! assert_eq!(lda.mode, AddressingMode::Immediate);
//! assert_eq!(lda.cycles, 2);
//! assert_eq!(lda.size(), 2);
//! ```

use std::fmt;

use crate::addressing::AddressingMode::{self, *};
use Mnemonic::*;

/// Instruction mnemonic, documented and undocumented.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // undocumented
    Ahx, Alr, Anc, Arr, Dcp, Isc, Jam, Las, Lax, Lxa, Rla, Rra, Sax, Sbx,
    Shx, Shy, Slo, Sre, Tas, Xaa,
}

/// How an instruction uses its memory operand. Decides which dummy
/// accesses the CPU performs while computing the effective address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandUse {
    None,
    Read,
    Write,
    ReadModifyWrite,
}

impl Mnemonic {
    pub const fn operand_use(self) -> OperandUse {
        match self {
            Lda | Ldx | Ldy | Eor | And | Ora | Adc | Sbc | Cmp | Cpx | Cpy | Bit | Lax | Las
            | Nop | Anc | Alr | Arr | Xaa | Lxa | Sbx => OperandUse::Read,
            Sta | Stx | Sty | Sax | Ahx | Shx | Shy | Tas => OperandUse::Write,
            Asl | Lsr | Rol | Ror | Inc | Dec | Slo | Rla | Sre | Rra | Dcp | Isc => {
                OperandUse::ReadModifyWrite
            }
            _ => OperandUse::None,
        }
    }

    #[rustfmt::skip]
    pub fn name(self) -> &'static str {
        match self {
            Adc => "ADC", And => "AND", Asl => "ASL", Bcc => "BCC", Bcs => "BCS",
            Beq => "BEQ", Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL",
            Brk => "BRK", Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
            Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
            Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR", Inc => "INC",
            Inx => "INX", Iny => "INY", Jmp => "JMP", Jsr => "JSR", Lda => "LDA",
            Ldx => "LDX", Ldy => "LDY", Lsr => "LSR", Nop => "NOP", Ora => "ORA",
            Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP", Rol => "ROL",
            Ror => "ROR", Rti => "RTI", Rts => "RTS", Sbc => "SBC", Sec => "SEC",
            Sed => "SED", Sei => "SEI", Sta => "STA", Stx => "STX", Sty => "STY",
            Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA", Txs => "TXS",
            Tya => "TYA", Ahx => "AHX", Alr => "ALR", Anc => "ANC", Arr => "ARR",
            Dcp => "DCP", Isc => "ISC", Jam => "JAM", Las => "LAS", Lax => "LAX",
            Lxa => "LXA", Rla => "RLA", Rra => "RRA", Sax => "SAX", Sbx => "SBX",
            Shx => "SHX", Shy => "SHY", Slo => "SLO", Sre => "SRE", Tas => "TAS",
            Xaa => "XAA",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static decode information for one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Cycles before page-cross and branch adjustments.
    pub cycles: u8,
    /// One extra cycle when an indexed read crosses a page.
    pub page_penalty: bool,
    /// Part of the official instruction set.
    pub documented: bool,
}

impl Instruction {
    /// Opcode plus operand bytes.
    pub const fn size(&self) -> u8 {
        1 + self.mode.operand_len()
    }

    pub const fn is_jam(&self) -> bool {
        matches!(self.mnemonic, Jam)
    }
}

const fn entry(
    opcode: u8,
    mnemonic: Mnemonic,
    mode: AddressingMode,
    cycles: u8,
    page_penalty: bool,
    documented: bool,
) -> Instruction {
    Instruction {
        opcode,
        mnemonic,
        mode,
        cycles,
        page_penalty,
        documented,
    }
}

const fn doc(op: u8, m: Mnemonic, mode: AddressingMode, cycles: u8) -> Instruction {
    entry(op, m, mode, cycles, false, true)
}

const fn doc_p(op: u8, m: Mnemonic, mode: AddressingMode, cycles: u8) -> Instruction {
    entry(op, m, mode, cycles, true, true)
}

const fn und(op: u8, m: Mnemonic, mode: AddressingMode, cycles: u8) -> Instruction {
    entry(op, m, mode, cycles, false, false)
}

const fn und_p(op: u8, m: Mnemonic, mode: AddressingMode, cycles: u8) -> Instruction {
    entry(op, m, mode, cycles, true, false)
}

/// Decode table indexed by opcode.
#[rustfmt::skip]
pub const OPCODE_TABLE: [Instruction; 256] = [
    doc(0x00, Brk, Implicit, 7),
    doc(0x01, Ora, IndirectX, 6),
    und(0x02, Jam, Implicit, 2),
    und(0x03, Slo, IndirectX, 8),
    und(0x04, Nop, ZeroPage, 3),
    doc(0x05, Ora, ZeroPage, 3),
    doc(0x06, Asl, ZeroPage, 5),
    und(0x07, Slo, ZeroPage, 5),
    doc(0x08, Php, Implicit, 3),
    doc(0x09, Ora, Immediate, 2),
    doc(0x0A, Asl, Accumulator, 2),
    und(0x0B, Anc, Immediate, 2),
    und(0x0C, Nop, Absolute, 4),
    doc(0x0D, Ora, Absolute, 4),
    doc(0x0E, Asl, Absolute, 6),
    und(0x0F, Slo, Absolute, 6),
    doc(0x10, Bpl, Relative, 2),
    doc_p(0x11, Ora, IndirectY, 5),
    und(0x12, Jam, Implicit, 2),
    und(0x13, Slo, IndirectY, 8),
    und(0x14, Nop, ZeroPageX, 4),
    doc(0x15, Ora, ZeroPageX, 4),
    doc(0x16, Asl, ZeroPageX, 6),
    und(0x17, Slo, ZeroPageX, 6),
    doc(0x18, Clc, Implicit, 2),
    doc_p(0x19, Ora, AbsoluteY, 4),
    und(0x1A, Nop, Implicit, 2),
    und(0x1B, Slo, AbsoluteY, 7),
    und_p(0x1C, Nop, AbsoluteX, 4),
    doc_p(0x1D, Ora, AbsoluteX, 4),
    doc(0x1E, Asl, AbsoluteX, 7),
    und(0x1F, Slo, AbsoluteX, 7),
    doc(0x20, Jsr, Absolute, 6),
    doc(0x21, And, IndirectX, 6),
    und(0x22, Jam, Implicit, 2),
    und(0x23, Rla, IndirectX, 8),
    doc(0x24, Bit, ZeroPage, 3),
    doc(0x25, And, ZeroPage, 3),
    doc(0x26, Rol, ZeroPage, 5),
    und(0x27, Rla, ZeroPage, 5),
    doc(0x28, Plp, Implicit, 4),
    doc(0x29, And, Immediate, 2),
    doc(0x2A, Rol, Accumulator, 2),
    und(0x2B, Anc, Immediate, 2),
    doc(0x2C, Bit, Absolute, 4),
    doc(0x2D, And, Absolute, 4),
    doc(0x2E, Rol, Absolute, 6),
    und(0x2F, Rla, Absolute, 6),
    doc(0x30, Bmi, Relative, 2),
    doc_p(0x31, And, IndirectY, 5),
    und(0x32, Jam, Implicit, 2),
    und(0x33, Rla, IndirectY, 8),
    und(0x34, Nop, ZeroPageX, 4),
    doc(0x35, And, ZeroPageX, 4),
    doc(0x36, Rol, ZeroPageX, 6),
    und(0x37, Rla, ZeroPageX, 6),
    doc(0x38, Sec, Implicit, 2),
    doc_p(0x39, And, AbsoluteY, 4),
    und(0x3A, Nop, Implicit, 2),
    und(0x3B, Rla, AbsoluteY, 7),
    und_p(0x3C, Nop, AbsoluteX, 4),
    doc_p(0x3D, And, AbsoluteX, 4),
    doc(0x3E, Rol, AbsoluteX, 7),
    und(0x3F, Rla, AbsoluteX, 7),
    doc(0x40, Rti, Implicit, 6),
    doc(0x41, Eor, IndirectX, 6),
    und(0x42, Jam, Implicit, 2),
    und(0x43, Sre, IndirectX, 8),
    und(0x44, Nop, ZeroPage, 3),
    doc(0x45, Eor, ZeroPage, 3),
    doc(0x46, Lsr, ZeroPage, 5),
    und(0x47, Sre, ZeroPage, 5),
    doc(0x48, Pha, Implicit, 3),
    doc(0x49, Eor, Immediate, 2),
    doc(0x4A, Lsr, Accumulator, 2),
    und(0x4B, Alr, Immediate, 2),
    doc(0x4C, Jmp, Absolute, 3),
    doc(0x4D, Eor, Absolute, 4),
    doc(0x4E, Lsr, Absolute, 6),
    und(0x4F, Sre, Absolute, 6),
    doc(0x50, Bvc, Relative, 2),
    doc_p(0x51, Eor, IndirectY, 5),
    und(0x52, Jam, Implicit, 2),
    und(0x53, Sre, IndirectY, 8),
    und(0x54, Nop, ZeroPageX, 4),
    doc(0x55, Eor, ZeroPageX, 4),
    doc(0x56, Lsr, ZeroPageX, 6),
    und(0x57, Sre, ZeroPageX, 6),
    doc(0x58, Cli, Implicit, 2),
    doc_p(0x59, Eor, AbsoluteY, 4),
    und(0x5A, Nop, Implicit, 2),
    und(0x5B, Sre, AbsoluteY, 7),
    und_p(0x5C, Nop, AbsoluteX, 4),
    doc_p(0x5D, Eor, AbsoluteX, 4),
    doc(0x5E, Lsr, AbsoluteX, 7),
    und(0x5F, Sre, AbsoluteX, 7),
    doc(0x60, Rts, Implicit, 6),
    doc(0x61, Adc, IndirectX, 6),
    und(0x62, Jam, Implicit, 2),
    und(0x63, Rra, IndirectX, 8),
    und(0x64, Nop, ZeroPage, 3),
    doc(0x65, Adc, ZeroPage, 3),
    doc(0x66, Ror, ZeroPage, 5),
    und(0x67, Rra, ZeroPage, 5),
    doc(0x68, Pla, Implicit, 4),
    doc(0x69, Adc, Immediate, 2),
    doc(0x6A, Ror, Accumulator, 2),
    und(0x6B, Arr, Immediate, 2),
    doc(0x6C, Jmp, Indirect, 5),
    doc(0x6D, Adc, Absolute, 4),
    doc(0x6E, Ror, Absolute, 6),
    und(0x6F, Rra, Absolute, 6),
    doc(0x70, Bvs, Relative, 2),
    doc_p(0x71, Adc, IndirectY, 5),
    und(0x72, Jam, Implicit, 2),
    und(0x73, Rra, IndirectY, 8),
    und(0x74, Nop, ZeroPageX, 4),
    doc(0x75, Adc, ZeroPageX, 4),
    doc(0x76, Ror, ZeroPageX, 6),
    und(0x77, Rra, ZeroPageX, 6),
    doc(0x78, Sei, Implicit, 2),
    doc_p(0x79, Adc, AbsoluteY, 4),
    und(0x7A, Nop, Implicit, 2),
    und(0x7B, Rra, AbsoluteY, 7),
    und_p(0x7C, Nop, AbsoluteX, 4),
    doc_p(0x7D, Adc, AbsoluteX, 4),
    doc(0x7E, Ror, AbsoluteX, 7),
    und(0x7F, Rra, AbsoluteX, 7),
    und(0x80, Nop, Immediate, 2),
    doc(0x81, Sta, IndirectX, 6),
    und(0x82, Nop, Immediate, 2),
    und(0x83, Sax, IndirectX, 6),
    doc(0x84, Sty, ZeroPage, 3),
    doc(0x85, Sta, ZeroPage, 3),
    doc(0x86, Stx, ZeroPage, 3),
    und(0x87, Sax, ZeroPage, 3),
    doc(0x88, Dey, Implicit, 2),
    und(0x89, Nop, Immediate, 2),
    doc(0x8A, Txa, Implicit, 2),
    und(0x8B, Xaa, Immediate, 2),
    doc(0x8C, Sty, Absolute, 4),
    doc(0x8D, Sta, Absolute, 4),
    doc(0x8E, Stx, Absolute, 4),
    und(0x8F, Sax, Absolute, 4),
    doc(0x90, Bcc, Relative, 2),
    doc(0x91, Sta, IndirectY, 6),
    und(0x92, Jam, Implicit, 2),
    und(0x93, Ahx, IndirectY, 6),
    doc(0x94, Sty, ZeroPageX, 4),
    doc(0x95, Sta, ZeroPageX, 4),
    doc(0x96, Stx, ZeroPageY, 4),
    und(0x97, Sax, ZeroPageY, 4),
    doc(0x98, Tya, Implicit, 2),
    doc(0x99, Sta, AbsoluteY, 5),
    doc(0x9A, Txs, Implicit, 2),
    und(0x9B, Tas, AbsoluteY, 5),
    und(0x9C, Shy, AbsoluteX, 5),
    doc(0x9D, Sta, AbsoluteX, 5),
    und(0x9E, Shx, AbsoluteY, 5),
    und(0x9F, Ahx, AbsoluteY, 5),
    doc(0xA0, Ldy, Immediate, 2),
    doc(0xA1, Lda, IndirectX, 6),
    doc(0xA2, Ldx, Immediate, 2),
    und(0xA3, Lax, IndirectX, 6),
    doc(0xA4, Ldy, ZeroPage, 3),
    doc(0xA5, Lda, ZeroPage, 3),
    doc(0xA6, Ldx, ZeroPage, 3),
    und(0xA7, Lax, ZeroPage, 3),
    doc(0xA8, Tay, Implicit, 2),
    doc(0xA9, Lda, Immediate, 2),
    doc(0xAA, Tax, Implicit, 2),
    und(0xAB, Lxa, Immediate, 2),
    doc(0xAC, Ldy, Absolute, 4),
    doc(0xAD, Lda, Absolute, 4),
    doc(0xAE, Ldx, Absolute, 4),
    und(0xAF, Lax, Absolute, 4),
    doc(0xB0, Bcs, Relative, 2),
    doc_p(0xB1, Lda, IndirectY, 5),
    und(0xB2, Jam, Implicit, 2),
    und_p(0xB3, Lax, IndirectY, 5),
    doc(0xB4, Ldy, ZeroPageX, 4),
    doc(0xB5, Lda, ZeroPageX, 4),
    doc(0xB6, Ldx, ZeroPageY, 4),
    und(0xB7, Lax, ZeroPageY, 4),
    doc(0xB8, Clv, Implicit, 2),
    doc_p(0xB9, Lda, AbsoluteY, 4),
    doc(0xBA, Tsx, Implicit, 2),
    und_p(0xBB, Las, AbsoluteY, 4),
    doc_p(0xBC, Ldy, AbsoluteX, 4),
    doc_p(0xBD, Lda, AbsoluteX, 4),
    doc_p(0xBE, Ldx, AbsoluteY, 4),
    und_p(0xBF, Lax, AbsoluteY, 4),
    doc(0xC0, Cpy, Immediate, 2),
    doc(0xC1, Cmp, IndirectX, 6),
    und(0xC2, Nop, Immediate, 2),
    und(0xC3, Dcp, IndirectX, 8),
    doc(0xC4, Cpy, ZeroPage, 3),
    doc(0xC5, Cmp, ZeroPage, 3),
    doc(0xC6, Dec, ZeroPage, 5),
    und(0xC7, Dcp, ZeroPage, 5),
    doc(0xC8, Iny, Implicit, 2),
    doc(0xC9, Cmp, Immediate, 2),
    doc(0xCA, Dex, Implicit, 2),
    und(0xCB, Sbx, Immediate, 2),
    doc(0xCC, Cpy, Absolute, 4),
    doc(0xCD, Cmp, Absolute, 4),
    doc(0xCE, Dec, Absolute, 6),
    und(0xCF, Dcp, Absolute, 6),
    doc(0xD0, Bne, Relative, 2),
    doc_p(0xD1, Cmp, IndirectY, 5),
    und(0xD2, Jam, Implicit, 2),
    und(0xD3, Dcp, IndirectY, 8),
    und(0xD4, Nop, ZeroPageX, 4),
    doc(0xD5, Cmp, ZeroPageX, 4),
    doc(0xD6, Dec, ZeroPageX, 6),
    und(0xD7, Dcp, ZeroPageX, 6),
    doc(0xD8, Cld, Implicit, 2),
    doc_p(0xD9, Cmp, AbsoluteY, 4),
    und(0xDA, Nop, Implicit, 2),
    und(0xDB, Dcp, AbsoluteY, 7),
    und_p(0xDC, Nop, AbsoluteX, 4),
    doc_p(0xDD, Cmp, AbsoluteX, 4),
    doc(0xDE, Dec, AbsoluteX, 7),
    und(0xDF, Dcp, AbsoluteX, 7),
    doc(0xE0, Cpx, Immediate, 2),
    doc(0xE1, Sbc, IndirectX, 6),
    und(0xE2, Nop, Immediate, 2),
    und(0xE3, Isc, IndirectX, 8),
    doc(0xE4, Cpx, ZeroPage, 3),
    doc(0xE5, Sbc, ZeroPage, 3),
    doc(0xE6, Inc, ZeroPage, 5),
    und(0xE7, Isc, ZeroPage, 5),
    doc(0xE8, Inx, Implicit, 2),
    doc(0xE9, Sbc, Immediate, 2),
    doc(0xEA, Nop, Implicit, 2),
    und(0xEB, Sbc, Immediate, 2),
    doc(0xEC, Cpx, Absolute, 4),
    doc(0xED, Sbc, Absolute, 4),
    doc(0xEE, Inc, Absolute, 6),
    und(0xEF, Isc, Absolute, 6),
    doc(0xF0, Beq, Relative, 2),
    doc_p(0xF1, Sbc, IndirectY, 5),
    und(0xF2, Jam, Implicit, 2),
    und(0xF3, Isc, IndirectY, 8),
    und(0xF4, Nop, ZeroPageX, 4),
    doc(0xF5, Sbc, ZeroPageX, 4),
    doc(0xF6, Inc, ZeroPageX, 6),
    und(0xF7, Isc, ZeroPageX, 6),
    doc(0xF8, Sed, Implicit, 2),
    doc_p(0xF9, Sbc, AbsoluteY, 4),
    und(0xFA, Nop, Implicit, 2),
    und(0xFB, Isc, AbsoluteY, 7),
    und_p(0xFC, Nop, AbsoluteX, 4),
    doc_p(0xFD, Sbc, AbsoluteX, 4),
    doc(0xFE, Inc, AbsoluteX, 7),
    und(0xFF, Isc, AbsoluteX, 7),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_opcode() {
        for (i, instr) in OPCODE_TABLE.iter().enumerate() {
            assert_eq!(instr.opcode as usize, i);
        }
    }

    #[test]
    fn test_documented_count() {
        assert_eq!(OPCODE_TABLE.iter().filter(|i| i.documented).count(), 151);
    }

    #[test]
    fn test_jam_codes() {
        let jams: Vec<u8> = OPCODE_TABLE
            .iter()
            .filter(|i| i.is_jam())
            .map(|i| i.opcode)
            .collect();
        assert_eq!(
            jams,
            vec![0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2]
        );
    }

    #[test]
    fn test_page_penalty_only_on_reads() {
        for instr in OPCODE_TABLE.iter().filter(|i| i.page_penalty) {
            assert_eq!(instr.mnemonic.operand_use(), OperandUse::Read, "{:02X}", instr.opcode);
            assert!(instr.mode.is_indexed_absolute());
        }
    }

    #[test]
    fn test_sizes() {
        assert_eq!(OPCODE_TABLE[0x00].size(), 1);
        assert_eq!(OPCODE_TABLE[0x6C].size(), 3);
        assert_eq!(OPCODE_TABLE[0xB1].size(), 2);
    }
}
