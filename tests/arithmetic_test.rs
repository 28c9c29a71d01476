//! Tests for the ALU instructions: ADC, SBC, CMP/CPX/CPY, AND/ORA/EOR and
//! BIT.
//!
//! Tests cover:
//! - Binary and decimal arithmetic with NMOS flag behaviour
//! - Carry and overflow conditions
//! - Cycle counts including page crossing penalties

use mos_machine::{Cpu, Flag, FlatMemory, MemoryBus};

/// CPU with `program` at 0x8000 and the reset vector pointing at it.
fn setup_cpu(program: &[u8]) -> (Cpu, FlatMemory) {
    let mut memory = FlatMemory::new();
    memory.write(0xFFFC, 0x00);
    memory.write(0xFFFD, 0x80);
    memory.load(0x8000, program);
    let cpu = Cpu::power_on(&mut memory);
    (cpu, memory)
}

// ========== ADC Binary ==========

#[test]
fn test_adc_immediate_basic() {
    let (mut cpu, mut memory) = setup_cpu(&[0x69, 0x05]); // ADC #$05
    cpu.set_a(0x10);
    cpu.set_flag(Flag::Carry, false);

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x15);
    assert!(!cpu.flag_c());
    assert!(!cpu.flag_z());
    assert!(!cpu.flag_v());
    assert!(!cpu.flag_n());
    assert_eq!(cpu.pc(), 0x8002);
    assert_eq!(cycles, 2);
}

#[test]
fn test_adc_with_carry_in() {
    let (mut cpu, mut memory) = setup_cpu(&[0x69, 0x05]);
    cpu.set_a(0x10);
    cpu.set_flag(Flag::Carry, true);

    cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x16);
}

#[test]
fn test_adc_carry_and_zero() {
    let (mut cpu, mut memory) = setup_cpu(&[0x69, 0xFF]);
    cpu.set_a(0x01);

    cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x00);
    assert!(cpu.flag_c());
    assert!(cpu.flag_z());
    assert!(!cpu.flag_v());
}

#[test]
fn test_adc_signed_overflow() {
    let (mut cpu, mut memory) = setup_cpu(&[0x69, 0x50]);
    cpu.set_a(0x50);

    cpu.step(&mut memory).unwrap();

    // +80 + +80 does not fit in a signed byte
    assert_eq!(cpu.a(), 0xA0);
    assert!(cpu.flag_v());
    assert!(cpu.flag_n());
    assert!(!cpu.flag_c());
}

#[test]
fn test_adc_negative_plus_negative_overflows() {
    let (mut cpu, mut memory) = setup_cpu(&[0x69, 0x90]);
    cpu.set_a(0x90);

    cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x20);
    assert!(cpu.flag_v());
    assert!(cpu.flag_c());
    assert!(!cpu.flag_n());
}

// ========== Addressing and Cycles ==========

#[test]
fn test_adc_zero_page() {
    let (mut cpu, mut memory) = setup_cpu(&[0x65, 0x42]); // ADC $42
    memory.write(0x0042, 0x22);
    cpu.set_a(0x11);

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x33);
    assert_eq!(cycles, 3);
}

#[test]
fn test_adc_absolute_x_no_page_cross() {
    let (mut cpu, mut memory) = setup_cpu(&[0x7D, 0x00, 0x20]); // ADC $2000,X
    memory.write(0x2005, 0x01);
    cpu.set_x(0x05);

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x01);
    assert_eq!(cycles, 4);
}

#[test]
fn test_adc_absolute_x_page_cross_costs_a_cycle() {
    let (mut cpu, mut memory) = setup_cpu(&[0x7D, 0xFF, 0x20]); // ADC $20FF,X
    memory.write(0x2100, 0x07);
    cpu.set_x(0x01);

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x07);
    assert_eq!(cycles, 5);
}

#[test]
fn test_adc_indirect_y_page_cross() {
    let (mut cpu, mut memory) = setup_cpu(&[0x71, 0x10]); // ADC ($10),Y
    memory.write(0x0010, 0xFF);
    memory.write(0x0011, 0x20);
    memory.write(0x2100, 0x09);
    cpu.set_y(0x01);

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x09);
    assert_eq!(cycles, 6);
}

#[test]
fn test_adc_indirect_x() {
    let (mut cpu, mut memory) = setup_cpu(&[0x61, 0x20]); // ADC ($20,X)
    memory.write(0x0024, 0x00);
    memory.write(0x0025, 0x30);
    memory.write(0x3000, 0x40);
    cpu.set_x(0x04);

    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x40);
    assert_eq!(cycles, 6);
}

// ========== Decimal Mode ==========

#[test]
fn test_adc_decimal_digit_carry() {
    let (mut cpu, mut memory) = setup_cpu(&[0xF8, 0x69, 0x01]); // SED; ADC #$01
    cpu.set_a(0x09);

    cpu.step(&mut memory).unwrap();
    cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x10);
    assert!(!cpu.flag_c());
}

#[test]
fn test_adc_decimal_wrap_uses_nmos_flags() {
    let (mut cpu, mut memory) = setup_cpu(&[0xF8, 0x69, 0x01]);
    cpu.set_a(0x99);

    cpu.step(&mut memory).unwrap();
    cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x00);
    assert!(cpu.flag_c());
    // Z from the binary sum, N from the intermediate result
    assert!(!cpu.flag_z());
    assert!(cpu.flag_n());
}

#[test]
fn test_sbc_decimal_borrow() {
    let (mut cpu, mut memory) = setup_cpu(&[0xF8, 0x38, 0xE9, 0x01]); // SED; SEC; SBC #$01
    cpu.set_a(0x00);

    for _ in 0..3 {
        cpu.step(&mut memory).unwrap();
    }

    assert_eq!(cpu.a(), 0x99);
    assert!(!cpu.flag_c());
    assert!(cpu.flag_n());
}

#[test]
fn test_decimal_mode_costs_no_extra_cycles() {
    let (mut cpu, mut memory) = setup_cpu(&[0xF8, 0x69, 0x25]);
    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.step(&mut memory).unwrap(), 2);
}

// ========== SBC Binary ==========

#[test]
fn test_sbc_without_borrow() {
    let (mut cpu, mut memory) = setup_cpu(&[0x38, 0xE9, 0x10]); // SEC; SBC #$10
    cpu.set_a(0x50);

    cpu.step(&mut memory).unwrap();
    cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x40);
    assert!(cpu.flag_c());
    assert!(!cpu.flag_v());
}

#[test]
fn test_sbc_with_borrow_in() {
    let (mut cpu, mut memory) = setup_cpu(&[0x18, 0xE9, 0x10]); // CLC; SBC #$10
    cpu.set_a(0x50);

    cpu.step(&mut memory).unwrap();
    cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x3F);
}

#[test]
fn test_sbc_signed_overflow() {
    let (mut cpu, mut memory) = setup_cpu(&[0x38, 0xE9, 0x01]);
    cpu.set_a(0x80);

    cpu.step(&mut memory).unwrap();
    cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x7F);
    assert!(cpu.flag_v());
    assert!(cpu.flag_c());
}

#[test]
fn test_undocumented_sbc_eb_matches_e9() {
    let (mut cpu, mut memory) = setup_cpu(&[0x38, 0xEB, 0x10]);
    cpu.set_a(0x50);

    cpu.step(&mut memory).unwrap();
    let cycles = cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x40);
    assert_eq!(cycles, 2);
}

// ========== Compare ==========

#[test]
fn test_cmp_equal() {
    let (mut cpu, mut memory) = setup_cpu(&[0xC9, 0x40]);
    cpu.set_a(0x40);

    cpu.step(&mut memory).unwrap();

    assert!(cpu.flag_z());
    assert!(cpu.flag_c());
    assert!(!cpu.flag_n());
    assert_eq!(cpu.a(), 0x40);
}

#[test]
fn test_cmp_less_than() {
    let (mut cpu, mut memory) = setup_cpu(&[0xC9, 0x20]);
    cpu.set_a(0x10);

    cpu.step(&mut memory).unwrap();

    assert!(!cpu.flag_z());
    assert!(!cpu.flag_c());
    assert!(cpu.flag_n());
}

#[test]
fn test_cpx_and_cpy() {
    let (mut cpu, mut memory) = setup_cpu(&[0xE0, 0x05, 0xC0, 0x06]); // CPX #$05; CPY #$06
    cpu.set_x(0x06);
    cpu.set_y(0x06);

    cpu.step(&mut memory).unwrap();
    assert!(cpu.flag_c());
    assert!(!cpu.flag_z());

    cpu.step(&mut memory).unwrap();
    assert!(cpu.flag_c());
    assert!(cpu.flag_z());
}

#[test]
fn test_compare_ignores_decimal_mode() {
    let (mut cpu, mut memory) = setup_cpu(&[0xF8, 0xC9, 0x0A]);
    cpu.set_a(0x10);

    cpu.step(&mut memory).unwrap();
    cpu.step(&mut memory).unwrap();

    assert!(cpu.flag_c());
    assert!(!cpu.flag_z());
    assert!(!cpu.flag_n());
}

// ========== Logical ==========

#[test]
fn test_and_ora_eor() {
    // AND #$0F; ORA #$80; EOR #$FF
    let (mut cpu, mut memory) = setup_cpu(&[0x29, 0x0F, 0x09, 0x80, 0x49, 0xFF]);
    cpu.set_a(0x5A);

    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.a(), 0x0A);

    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.a(), 0x8A);
    assert!(cpu.flag_n());

    cpu.step(&mut memory).unwrap();
    assert_eq!(cpu.a(), 0x75);
    assert!(!cpu.flag_n());
    assert!(!cpu.flag_z());
}

#[test]
fn test_and_zero_result() {
    let (mut cpu, mut memory) = setup_cpu(&[0x29, 0x0F]);
    cpu.set_a(0xF0);

    cpu.step(&mut memory).unwrap();

    assert_eq!(cpu.a(), 0x00);
    assert!(cpu.flag_z());
}

// ========== BIT ==========

#[test]
fn test_bit_copies_high_bits_and_tests_mask() {
    let (mut cpu, mut memory) = setup_cpu(&[0x24, 0x10]); // BIT $10
    memory.write(0x0010, 0xC0);
    cpu.set_a(0x01);

    let cycles = cpu.step(&mut memory).unwrap();

    assert!(cpu.flag_n());
    assert!(cpu.flag_v());
    assert!(cpu.flag_z());
    assert_eq!(cpu.a(), 0x01);
    assert_eq!(cycles, 3);
}

#[test]
fn test_bit_absolute_nonzero() {
    let (mut cpu, mut memory) = setup_cpu(&[0x2C, 0x00, 0x30]); // BIT $3000
    memory.write(0x3000, 0x01);
    cpu.set_a(0x01);

    let cycles = cpu.step(&mut memory).unwrap();

    assert!(!cpu.flag_n());
    assert!(!cpu.flag_v());
    assert!(!cpu.flag_z());
    assert_eq!(cycles, 4);
}
