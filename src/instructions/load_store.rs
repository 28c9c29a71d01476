//! # Load and Store Instructions

use super::{load, Operand};
use crate::cpu::Cpu;
use crate::memory::MemoryBus;

pub(crate) fn lda<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    cpu.a = load(cpu, bus, op);
    cpu.p.update_zn(cpu.a);
    0
}

pub(crate) fn ldx<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    cpu.x = load(cpu, bus, op);
    cpu.p.update_zn(cpu.x);
    0
}

pub(crate) fn ldy<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    cpu.y = load(cpu, bus, op);
    cpu.p.update_zn(cpu.y);
    0
}

/// STA/STX/STY/SAX. Flags are untouched.
pub(crate) fn store<B: MemoryBus>(bus: &mut B, op: Operand, value: u8) -> u32 {
    if let Operand::Memory { address, .. } = op {
        bus.write(address, value);
    }
    0
}
