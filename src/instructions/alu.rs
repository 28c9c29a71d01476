//! # ALU Instructions
//!
//! ADC/SBC honour the D flag; everything else is binary.

use super::{load, Operand};
use crate::cpu::Cpu;
use crate::memory::MemoryBus;
use crate::numeric::{self, ArithResult, Format};
use crate::registers::Flag;

fn format(cpu: &Cpu) -> Format {
    if cpu.p.decimal() {
        Format::PackedDecimal
    } else {
        Format::Binary
    }
}

fn apply_arith(cpu: &mut Cpu, r: ArithResult) {
    cpu.a = r.value;
    cpu.p.set(Flag::Carry, r.carry);
    cpu.p.set(Flag::Zero, r.zero);
    cpu.p.set(Flag::Negative, r.negative);
    cpu.p.set(Flag::Overflow, r.overflow);
}

/// A + M + C, in decimal when D is set.
pub(crate) fn add(cpu: &mut Cpu, value: u8) {
    let r = numeric::add_with_carry(cpu.a, value, cpu.p.carry(), format(cpu));
    apply_arith(cpu, r);
}

/// A - M - !C, in decimal when D is set.
pub(crate) fn subtract(cpu: &mut Cpu, value: u8) {
    let r = numeric::subtract_with_borrow(cpu.a, value, cpu.p.carry(), format(cpu));
    apply_arith(cpu, r);
}

pub(crate) fn adc<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    add(cpu, value);
    0
}

pub(crate) fn sbc<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    subtract(cpu, value);
    0
}

pub(crate) fn and<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    cpu.a &= value;
    cpu.p.update_zn(cpu.a);
    0
}

pub(crate) fn ora<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    cpu.a |= value;
    cpu.p.update_zn(cpu.a);
    0
}

pub(crate) fn eor<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    cpu.a ^= value;
    cpu.p.update_zn(cpu.a);
    0
}

/// Sets C, Z, N from `register - value`.
pub(crate) fn compare_value(cpu: &mut Cpu, register: u8, value: u8) {
    let r = numeric::compare(register, value);
    cpu.p.set(Flag::Carry, r.carry);
    cpu.p.set(Flag::Zero, r.zero);
    cpu.p.set(Flag::Negative, r.negative);
}

pub(crate) fn compare<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand, register: u8) -> u32 {
    let value = load(cpu, bus, op);
    compare_value(cpu, register, value);
    0
}

/// Z from A & M; N and V copied from bits 7 and 6 of M.
pub(crate) fn bit<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    let value = load(cpu, bus, op);
    cpu.p.set(Flag::Zero, cpu.a & value == 0);
    cpu.p.set(Flag::Negative, value & 0x80 != 0);
    cpu.p.set(Flag::Overflow, value & 0x40 != 0);
    0
}
