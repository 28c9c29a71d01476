//! # Control Flow Instructions
//!
//! JMP, JSR, RTS, RTI, BRK and NOP.

use super::{load, Operand};
use crate::cpu::Cpu;
use crate::interrupts::CpuInterrupt;
use crate::memory::MemoryBus;
use crate::registers::{Flag, StatusRegister};

pub(crate) fn jmp(cpu: &mut Cpu, op: Operand) -> u32 {
    if let Operand::Memory { address, .. } = op {
        cpu.pc.set(address);
    }
    0
}

/// Pushes the address of the JSR's last byte, then jumps.
pub(crate) fn jsr<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    if let Operand::Memory { address, .. } = op {
        let return_to = cpu.pc.value().wrapping_sub(1);
        cpu.push_word(bus, return_to);
        cpu.pc.set(address);
    }
    0
}

pub(crate) fn rts<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B) -> u32 {
    let address = cpu.pull_word(bus);
    cpu.pc.set(address.wrapping_add(1));
    0
}

pub(crate) fn rti<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B) -> u32 {
    let status = cpu.pull(bus);
    cpu.p = StatusRegister::from_pulled(status);
    let address = cpu.pull_word(bus);
    cpu.pc.set(address);
    0
}

/// BRK skips a padding byte: the pushed return address is BRK + 2.
pub(crate) fn brk<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B) -> u32 {
    let return_to = cpu.pc.value().wrapping_add(1);
    cpu.push_word(bus, return_to);
    cpu.push(bus, cpu.p.pushed_by_software());
    cpu.p.set(Flag::InterruptDisable, true);
    let handler = cpu.read_vector(bus, CpuInterrupt::Irq.vector());
    cpu.pc.set(handler);
    0
}

/// NOPs with a memory operand still perform the read.
pub(crate) fn nop<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, op: Operand) -> u32 {
    if let Operand::Memory { .. } = op {
        load(cpu, bus, op);
    }
    0
}
