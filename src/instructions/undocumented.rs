//! # Undocumented NMOS Instructions
//!
//! Most combine a read-modify-write with an ALU operation on the result.
//! The "unstable" group (XAA, LXA, SHX, SHY, AHX, TAS) follows the values
//! observed on common C64 silicon: `0xEE` for the analog "magic" constant
//! and the high-byte-plus-one AND for the stores.

use super::alu::{add, compare_value, subtract};
use super::shifts::{asl_value, lsr_value, rol_value, ror_value};
use super::{load, modify, Operand};
use crate::cpu::Cpu;
use crate::memory::MemoryBus;
use crate::registers::Flag;

const MAGIC: u8 = 0xEE;

/// ASL memory, then ORA.
pub(crate) fn slo<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = modify(cpu, bus, op, asl_value);
    cpu.a |= value;
    cpu.p.update_zn(cpu.a);
    0
}

/// ROL memory, then AND.
pub(crate) fn rla<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = modify(cpu, bus, op, rol_value);
    cpu.a &= value;
    cpu.p.update_zn(cpu.a);
    0
}

/// LSR memory, then EOR.
pub(crate) fn sre<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = modify(cpu, bus, op, lsr_value);
    cpu.a ^= value;
    cpu.p.update_zn(cpu.a);
    0
}

/// ROR memory, then ADC with the rotated-out carry.
pub(crate) fn rra<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = modify(cpu, bus, op, ror_value);
    add(cpu, value);
    0
}

pub(crate) fn lax<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    cpu.a = value;
    cpu.x = value;
    cpu.p.update_zn(value);
    0
}

/// DEC memory, then CMP.
pub(crate) fn dcp<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = modify(cpu, bus, op, |_, v| v.wrapping_sub(1));
    let register = cpu.a;
    compare_value(cpu, register, value);
    0
}

/// INC memory, then SBC.
pub(crate) fn isc<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = modify(cpu, bus, op, |_, v| v.wrapping_add(1));
    subtract(cpu, value);
    0
}

/// AND immediate; C copies N.
pub(crate) fn anc<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    cpu.a &= value;
    cpu.p.update_zn(cpu.a);
    cpu.p.set(Flag::Carry, cpu.a & 0x80 != 0);
    0
}

/// AND immediate, then LSR A.
pub(crate) fn alr<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    let masked = cpu.a & value;
    cpu.a = lsr_value(cpu, masked);
    0
}

/// AND immediate, then ROR A with odd flag rules. In decimal mode the
/// result gets a BCD-style fixup per nibble.
pub(crate) fn arr<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    let masked = cpu.a & value;
    let carry_in = (cpu.p.carry() as u8) << 7;
    let mut result = (masked >> 1) | carry_in;

    if !cpu.p.decimal() {
        cpu.p.update_zn(result);
        cpu.p.set(Flag::Carry, result & 0x40 != 0);
        cpu.p.set(Flag::Overflow, ((result >> 6) ^ (result >> 5)) & 1 != 0);
        cpu.a = result;
        return 0;
    }

    cpu.p.set(Flag::Negative, carry_in != 0);
    cpu.p.set(Flag::Zero, result == 0);
    cpu.p.set(Flag::Overflow, (result ^ masked) & 0x40 != 0);
    if (masked & 0x0F) + (masked & 0x01) > 0x05 {
        result = (result & 0xF0) | (result.wrapping_add(0x06) & 0x0F);
    }
    let high_fix = (masked as u16 & 0xF0) + (masked as u16 & 0x10) > 0x50;
    if high_fix {
        result = (result & 0x0F) | (result.wrapping_add(0x60) & 0xF0);
    }
    cpu.p.set(Flag::Carry, high_fix);
    cpu.a = result;
    0
}

/// A = (A | magic) & X & imm.
pub(crate) fn xaa<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    cpu.a = (cpu.a | MAGIC) & cpu.x & value;
    cpu.p.update_zn(cpu.a);
    0
}

/// A = X = (A | magic) & imm.
pub(crate) fn lxa<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    let result = (cpu.a | MAGIC) & value;
    cpu.a = result;
    cpu.x = result;
    cpu.p.update_zn(result);
    0
}

/// X = (A & X) - imm, setting flags like CMP.
pub(crate) fn sbx<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    let register = cpu.a & cpu.x;
    compare_value(cpu, register, value);
    cpu.x = register.wrapping_sub(value);
    0
}

/// A = X = SP = M & SP.
pub(crate) fn las<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op) & cpu.sp;
    cpu.a = value;
    cpu.x = value;
    cpu.sp = value;
    cpu.p.update_zn(value);
    0
}

/// SP = A & X, then stores SP & (H + 1).
pub(crate) fn tas<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    cpu.sp = cpu.a & cpu.x;
    unstable_store(bus, op, cpu.sp)
}

/// SHX/SHY/AHX store `value & (H + 1)`, H being the high byte of the base
/// address. When indexing crosses a page the stored value also replaces
/// the high byte of the target address.
pub(crate) fn unstable_store<B: MemoryBus>(bus: &mut B, op: Operand, value: u8) -> u32 {
    let Operand::Memory {
        address,
        page_crossed,
    } = op
    else {
        return 0;
    };
    let high = (address >> 8) as u8;
    let base_high = if page_crossed { high.wrapping_sub(1) } else { high };
    let stored = value & base_high.wrapping_add(1);
    let target = if page_crossed {
        ((stored as u16) << 8) | (address & 0x00FF)
    } else {
        address
    };
    bus.write(target, stored);
    0
}

#[cfg(test)]
mod tests {
    use crate::cpu::Cpu;
    use crate::memory::{FlatMemory, MemoryBus};

    fn setup(program: &[u8]) -> (Cpu, FlatMemory) {
        let mut mem = FlatMemory::new();
        mem.load(0x0200, program);
        let mut cpu = Cpu::new();
        cpu.set_pc(0x0200);
        (cpu, mem)
    }

    #[test]
    fn test_lax_loads_a_and_x() {
        let (mut cpu, mut mem) = setup(&[0xA7, 0x10]); // LAX $10
        mem.write(0x0010, 0x80);
        assert_eq!(cpu.step(&mut mem), Ok(3));
        assert_eq!((cpu.a(), cpu.x()), (0x80, 0x80));
        assert!(cpu.flag_n());
    }

    #[test]
    fn test_dcp_decrements_then_compares() {
        let (mut cpu, mut mem) = setup(&[0xC7, 0x10]); // DCP $10
        mem.write(0x0010, 0x43);
        cpu.set_a(0x42);
        assert_eq!(cpu.step(&mut mem), Ok(5));
        assert_eq!(mem.peek(0x0010), 0x42);
        assert!(cpu.flag_z() && cpu.flag_c());
    }

    #[test]
    fn test_isc_increments_then_subtracts() {
        let (mut cpu, mut mem) = setup(&[0xE7, 0x10]); // ISC $10
        mem.write(0x0010, 0x0F);
        cpu.set_a(0x20);
        cpu.set_flag(crate::registers::Flag::Carry, true);
        cpu.step(&mut mem).unwrap();
        assert_eq!(mem.peek(0x0010), 0x10);
        assert_eq!(cpu.a(), 0x10);
    }

    #[test]
    fn test_slo_shifts_then_ors() {
        let (mut cpu, mut mem) = setup(&[0x07, 0x10]); // SLO $10
        mem.write(0x0010, 0x81);
        cpu.set_a(0x01);
        cpu.step(&mut mem).unwrap();
        assert_eq!(mem.peek(0x0010), 0x02);
        assert_eq!(cpu.a(), 0x03);
        assert!(cpu.flag_c());
    }

    #[test]
    fn test_sax_stores_a_and_x() {
        let (mut cpu, mut mem) = setup(&[0x87, 0x10]); // SAX $10
        cpu.set_a(0xF0);
        cpu.set_x(0x3C);
        cpu.step(&mut mem).unwrap();
        assert_eq!(mem.peek(0x0010), 0x30);
    }

    #[test]
    fn test_anc_copies_negative_into_carry() {
        let (mut cpu, mut mem) = setup(&[0x0B, 0x80]); // ANC #$80
        cpu.set_a(0xFF);
        cpu.step(&mut mem).unwrap();
        assert_eq!(cpu.a(), 0x80);
        assert!(cpu.flag_c() && cpu.flag_n());
    }

    #[test]
    fn test_alr_ands_then_shifts() {
        let (mut cpu, mut mem) = setup(&[0x4B, 0x03]); // ALR #$03
        cpu.set_a(0xFF);
        cpu.step(&mut mem).unwrap();
        assert_eq!(cpu.a(), 0x01);
        assert!(cpu.flag_c());
    }

    #[test]
    fn test_arr_binary_flags() {
        let (mut cpu, mut mem) = setup(&[0x6B, 0xFF]); // ARR #$FF
        cpu.set_a(0xC0);
        cpu.set_flag(crate::registers::Flag::Carry, true);
        cpu.step(&mut mem).unwrap();
        assert_eq!(cpu.a(), 0xE0);
        assert!(cpu.flag_c());
        assert!(!cpu.flag_v());
    }

    #[test]
    fn test_sbx_subtracts_from_a_and_x() {
        let (mut cpu, mut mem) = setup(&[0xCB, 0x02]); // SBX #$02
        cpu.set_a(0x0F);
        cpu.set_x(0x07);
        cpu.step(&mut mem).unwrap();
        assert_eq!(cpu.x(), 0x05);
        assert!(cpu.flag_c());
    }

    #[test]
    fn test_shx_without_page_cross() {
        let (mut cpu, mut mem) = setup(&[0x9E, 0x00, 0x12]); // SHX $1200,Y
        cpu.set_x(0xFF);
        cpu.set_y(0x05);
        assert_eq!(cpu.step(&mut mem), Ok(5));
        assert_eq!(mem.peek(0x1205), 0x13);
    }
}
