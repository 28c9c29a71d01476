//! # Increment and Decrement Instructions

use super::{modify, Operand};
use crate::cpu::Cpu;
use crate::memory::MemoryBus;

pub(crate) fn inc<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    modify(cpu, bus, op, |cpu, v| {
        let r = v.wrapping_add(1);
        cpu.p.update_zn(r);
        r
    });
    0
}

pub(crate) fn dec<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    modify(cpu, bus, op, |cpu, v| {
        let r = v.wrapping_sub(1);
        cpu.p.update_zn(r);
        r
    });
    0
}

pub(crate) fn inx(cpu: &mut Cpu) -> u32 {
    cpu.x = cpu.x.wrapping_add(1);
    cpu.p.update_zn(cpu.x);
    0
}

pub(crate) fn iny(cpu: &mut Cpu) -> u32 {
    cpu.y = cpu.y.wrapping_add(1);
    cpu.p.update_zn(cpu.y);
    0
}

pub(crate) fn dex(cpu: &mut Cpu) -> u32 {
    cpu.x = cpu.x.wrapping_sub(1);
    cpu.p.update_zn(cpu.x);
    0
}

pub(crate) fn dey(cpu: &mut Cpu) -> u32 {
    cpu.y = cpu.y.wrapping_sub(1);
    cpu.p.update_zn(cpu.y);
    0
}
