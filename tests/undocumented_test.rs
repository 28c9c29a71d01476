//! Tests for the undocumented NMOS opcodes, JAM and the illegal-opcode
//! policy.
//!
//! Tests cover:
//! - Combined read-modify-write opcodes (RLA, SRE, RRA, DCP)
//! - LAX/SAX/LAS loads and stores
//! - NOP variants with operands and their cycle counts
//! - Every JAM opcode halting the CPU
//! - IllegalOpcodePolicy::Halt

use mos_machine::address::Address;
use mos_machine::opcodes::OPCODE_TABLE;
use mos_machine::{
    Cpu, CpuInterrupt, ExecutionError, Flag, FlatMemory, IllegalOpcodePolicy, MemoryBus,
};

fn setup_cpu(program: &[u8]) -> (Cpu, FlatMemory) {
    let mut memory = FlatMemory::new();
    memory.write(0xFFFC, 0x00);
    memory.write(0xFFFD, 0x80);
    memory.load(0x8000, program);
    let cpu = Cpu::power_on(&mut memory);
    (cpu, memory)
}

// ========== Read-Modify-Write Combinations ==========

#[test]
fn test_rla_rotates_then_ands() {
    let (mut cpu, mut memory) = setup_cpu(&[0x27, 0x10]); // RLA $10
    memory.write(0x0010, 0x80);
    cpu.set_flag(Flag::Carry, true);
    cpu.set_a(0xFF);

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(memory.read(0x0010), 0x01);
    assert_eq!(cpu.a(), 0x01);
    assert!(cpu.flag_c());
    assert_eq!(cycles, 5);
}

#[test]
fn test_sre_shifts_then_eors() {
    let (mut cpu, mut memory) = setup_cpu(&[0x47, 0x10]); // SRE $10
    memory.write(0x0010, 0x03);
    cpu.set_a(0xFF);

    cpu.step(&mut memory).unwrap();

    assert_eq!(memory.read(0x0010), 0x01);
    assert_eq!(cpu.a(), 0xFE);
    assert!(cpu.flag_c());
    assert!(cpu.flag_n());
}

#[test]
fn test_rra_rotates_then_adds() {
    let (mut cpu, mut memory) = setup_cpu(&[0x67, 0x10]); // RRA $10
    memory.write(0x0010, 0x02);
    cpu.set_a(0x10);

    cpu.step(&mut memory).unwrap();

    assert_eq!(memory.read(0x0010), 0x01);
    assert_eq!(cpu.a(), 0x11);
    assert!(!cpu.flag_c());
}

#[test]
fn test_dcp_absolute() {
    let (mut cpu, mut memory) = setup_cpu(&[0xCF, 0x00, 0x30]); // DCP $3000
    memory.write(0x3000, 0x41);
    cpu.set_a(0x40);

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(memory.read(0x3000), 0x40);
    assert!(cpu.flag_z());
    assert!(cpu.flag_c());
    assert_eq!(cycles, 6);
}

// ========== Loads and Stores ==========

#[test]
fn test_lax_indirect_y_page_cross() {
    let (mut cpu, mut memory) = setup_cpu(&[0xB3, 0x20]); // LAX ($20),Y
    memory.write(0x0020, 0xFF);
    memory.write(0x0021, 0x30);
    memory.write(0x3100, 0x8C);
    cpu.set_y(0x01);

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x8C);
    assert_eq!(cpu.x(), 0x8C);
    assert!(cpu.flag_n());
    assert_eq!(cycles, 6);
}

#[test]
fn test_sax_indirect_x() {
    let (mut cpu, mut memory) = setup_cpu(&[0x83, 0x10]); // SAX ($10,X)
    memory.write(0x0012, 0x00);
    memory.write(0x0013, 0x40);
    cpu.set_a(0xF0);
    cpu.set_x(0x02);
    let before = cpu.status();

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(memory.read(0x4000), 0x00);
    assert_eq!(cpu.status(), before);
    assert_eq!(cycles, 6);
}

#[test]
fn test_las_ands_with_stack_pointer() {
    let (mut cpu, mut memory) = setup_cpu(&[0xBB, 0x00, 0x30]); // LAS $3000,Y
    memory.write(0x3000, 0x0F);
    cpu.set_y(0x00);

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x0D);
    assert_eq!(cpu.x(), 0x0D);
    assert_eq!(cpu.sp(), 0x0D);
    assert_eq!(cycles, 4);
}

#[test]
fn test_shy_stores_y_and_high_byte_plus_one() {
    let (mut cpu, mut memory) = setup_cpu(&[0x9C, 0x00, 0x12]); // SHY $1200,X
    cpu.set_x(0x05);
    cpu.set_y(0xFF);

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(memory.read(0x1205), 0x13);
    assert_eq!(cycles, 5);
}

// ========== NOP Variants ==========

#[test]
fn test_nop_variants_skip_operands() {
    // NOP #imm; NOP zp; NOP abs,X
    let (mut cpu, mut memory) = setup_cpu(&[0x80, 0xFF, 0x04, 0x10, 0x1C, 0x00, 0x30]);
    cpu.set_x(0x01);
    let before = cpu.status();

    assert_eq!(cpu.step(&mut memory).unwrap(), 2);
    assert_eq!(cpu.pc(), 0x8002);
    assert_eq!(cpu.step(&mut memory).unwrap(), 3);
    assert_eq!(cpu.pc(), 0x8004);
    assert_eq!(cpu.step(&mut memory).unwrap(), 4);
    assert_eq!(cpu.pc(), 0x8007);
    assert_eq!(cpu.status(), before);
}

#[test]
fn test_nop_absolute_x_page_cross() {
    let (mut cpu, mut memory) = setup_cpu(&[0x1C, 0xFF, 0x30]);
    cpu.set_x(0x01);

    assert_eq!(cpu.step(&mut memory).unwrap(), 5);
}

// ========== JAM ==========

#[test]
fn test_every_jam_opcode_halts() {
    let jams: Vec<u8> = OPCODE_TABLE.iter().filter(|i| i.is_jam()).map(|i| i.opcode).collect();
    assert_eq!(
        jams,
        vec![0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2]
    );

    for opcode in jams {
        let (mut cpu, mut memory) = setup_cpu(&[opcode]);
        cpu.step(&mut memory).unwrap();
        assert!(cpu.is_halted(), "opcode {:02X}", opcode);
        assert_eq!(
            cpu.step(&mut memory),
            Err(ExecutionError::Halted {
                address: Address::new(0x8000)
            })
        );
    }
}

#[test]
fn test_halted_cpu_ignores_interrupt_lines() {
    let (mut cpu, mut memory) = setup_cpu(&[0x02]);
    cpu.step(&mut memory).unwrap();
    memory.set_nmi_line(true);

    assert!(cpu.step(&mut memory).is_err());
    assert_eq!(cpu.pc(), 0x8000);

    cpu.request_interrupt(CpuInterrupt::Reset);
    assert_eq!(cpu.step(&mut memory).unwrap(), 7);
    assert!(!cpu.is_halted());
}

// ========== Policy ==========

#[test]
fn test_halt_policy_leaves_documented_opcodes_alone() {
    let (cpu, mut memory) = setup_cpu(&[0xA9, 0x01, 0xEB, 0x01]);
    let mut cpu = cpu.with_policy(IllegalOpcodePolicy::Halt);

    assert_eq!(cpu.step(&mut memory).unwrap(), 2);
    assert_eq!(
        cpu.step(&mut memory),
        Err(ExecutionError::IllegalOpcode {
            opcode: 0xEB,
            address: Address::new(0x8002)
        })
    );
    assert!(cpu.is_halted());
    assert_eq!(cpu.pc(), 0x8002);
    assert_eq!(cpu.a(), 0x01);
}

#[test]
fn test_policy_count_matches_table() {
    let undocumented = OPCODE_TABLE
        .iter()
        .filter(|i| !i.documented && !i.is_jam())
        .count();
    assert_eq!(undocumented, 256 - 151 - 12);
}
