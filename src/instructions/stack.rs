//! # Stack Instructions

use crate::cpu::Cpu;
use crate::memory::MemoryBus;
use crate::registers::StatusRegister;

pub(crate) fn pha<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B) -> u32 {
    cpu.push(bus, cpu.a);
    0
}

/// Pushes P with B and bit 5 set.
pub(crate) fn php<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B) -> u32 {
    cpu.push(bus, cpu.p.pushed_by_software());
    0
}

pub(crate) fn pla<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B) -> u32 {
    cpu.a = cpu.pull(bus);
    cpu.p.update_zn(cpu.a);
    0
}

pub(crate) fn plp<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B) -> u32 {
    let value = cpu.pull(bus);
    cpu.p = StatusRegister::from_pulled(value);
    0
}
