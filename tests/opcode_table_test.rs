//! Opcode table validation tests
//!
//! Verifies that the decode table is complete and agrees with itself.

use std::collections::HashSet;

use mos_machine::opcodes::Mnemonic;
use mos_machine::{AddressingMode, OPCODE_TABLE};

#[test]
fn test_table_indexed_by_opcode() {
    assert_eq!(OPCODE_TABLE.len(), 256);
    for (index, instr) in OPCODE_TABLE.iter().enumerate() {
        assert_eq!(instr.opcode as usize, index, "entry {:02X} out of place", index);
    }
}

#[test]
fn test_documented_count() {
    let documented = OPCODE_TABLE.iter().filter(|i| i.documented).count();
    assert_eq!(documented, 151);

    let names: HashSet<_> = OPCODE_TABLE
        .iter()
        .filter(|i| i.documented)
        .map(|i| i.mnemonic)
        .collect();
    assert_eq!(names.len(), 56);
}

#[test]
fn test_jam_opcodes() {
    let jams: Vec<u8> = OPCODE_TABLE
        .iter()
        .filter(|i| i.is_jam())
        .map(|i| i.opcode)
        .collect();

    assert_eq!(
        jams,
        vec![0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2]
    );
    assert!(OPCODE_TABLE.iter().filter(|i| i.is_jam()).all(|i| !i.documented));
}

#[test]
fn test_size_matches_addressing_mode() {
    for instr in OPCODE_TABLE.iter() {
        let expected = match instr.mode {
            AddressingMode::Implicit | AddressingMode::Accumulator => 1,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::Relative
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY => 2,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 3,
        };
        assert_eq!(instr.size(), expected, "${:02X} {}", instr.opcode, instr.mnemonic);
    }
}

#[test]
fn test_cycle_cost_range() {
    for instr in OPCODE_TABLE.iter() {
        assert!(
            (2..=8).contains(&instr.cycles),
            "${:02X} {} has {} cycles",
            instr.opcode,
            instr.mnemonic,
            instr.cycles
        );
    }
}

#[test]
fn test_page_penalty_only_on_indexed_reads() {
    for instr in OPCODE_TABLE.iter().filter(|i| i.page_penalty) {
        assert!(
            instr.mode.is_indexed_absolute(),
            "${:02X} {} pays a page penalty in mode {:?}",
            instr.opcode,
            instr.mnemonic,
            instr.mode
        );
    }
    // Stores never pay it
    assert!(!OPCODE_TABLE[0x9D].page_penalty);
    assert!(!OPCODE_TABLE[0x91].page_penalty);
    assert!(OPCODE_TABLE[0xBD].page_penalty);
}

#[test]
fn test_known_opcodes() {
    let brk = &OPCODE_TABLE[0x00];
    assert_eq!(brk.mnemonic, Mnemonic::Brk);
    assert_eq!(brk.cycles, 7);
    assert_eq!(brk.size(), 1);

    let jmp_ind = &OPCODE_TABLE[0x6C];
    assert_eq!(jmp_ind.mnemonic, Mnemonic::Jmp);
    assert_eq!(jmp_ind.mode, AddressingMode::Indirect);
    assert_eq!(jmp_ind.cycles, 5);

    let lax = &OPCODE_TABLE[0xA7];
    assert_eq!(lax.mnemonic, Mnemonic::Lax);
    assert!(!lax.documented);

    // $EB behaves as SBC #
    assert_eq!(OPCODE_TABLE[0xEB].mnemonic, Mnemonic::Sbc);
    assert!(!OPCODE_TABLE[0xEB].documented);
}

#[test]
fn test_mnemonic_display() {
    assert_eq!(Mnemonic::Lda.to_string(), "LDA");
    assert_eq!(OPCODE_TABLE[0x0B].mnemonic.name(), "ANC");
}
