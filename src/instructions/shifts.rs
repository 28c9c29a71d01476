//! # Shift and Rotate Instructions

use super::{modify, Operand};
use crate::cpu::Cpu;
use crate::memory::MemoryBus;
use crate::numeric::UByte;
use crate::registers::Flag;

fn finish(cpu: &mut Cpu, (result, carry): (UByte, bool)) -> u8 {
    cpu.p.set(Flag::Carry, carry);
    cpu.p.update_zn(result.value());
    result.value()
}

pub(crate) fn asl_value(cpu: &mut Cpu, value: u8) -> u8 {
    finish(cpu, UByte::new(value).shift_left())
}

pub(crate) fn lsr_value(cpu: &mut Cpu, value: u8) -> u8 {
    finish(cpu, UByte::new(value).shift_right())
}

pub(crate) fn rol_value(cpu: &mut Cpu, value: u8) -> u8 {
    let carry = cpu.p.carry();
    finish(cpu, UByte::new(value).rotate_left(carry))
}

pub(crate) fn ror_value(cpu: &mut Cpu, value: u8) -> u8 {
    let carry = cpu.p.carry();
    finish(cpu, UByte::new(value).rotate_right(carry))
}

pub(crate) fn asl<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    modify(cpu, bus, op, asl_value);
    0
}

pub(crate) fn lsr<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    modify(cpu, bus, op, lsr_value);
    0
}

pub(crate) fn rol<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    modify(cpu, bus, op, rol_value);
    0
}

pub(crate) fn ror<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    modify(cpu, bus, op, ror_value);
    0
}
