//! # Register Transfer Instructions
//!
//! All transfers set Z and N except TXS.

use crate::cpu::Cpu;

pub(crate) fn tax(cpu: &mut Cpu) -> u32 {
    cpu.x = cpu.a;
    cpu.p.update_zn(cpu.x);
    0
}

pub(crate) fn tay(cpu: &mut Cpu) -> u32 {
    cpu.y = cpu.a;
    cpu.p.update_zn(cpu.y);
    0
}

pub(crate) fn txa(cpu: &mut Cpu) -> u32 {
    cpu.a = cpu.x;
    cpu.p.update_zn(cpu.a);
    0
}

pub(crate) fn tya(cpu: &mut Cpu) -> u32 {
    cpu.a = cpu.y;
    cpu.p.update_zn(cpu.a);
    0
}

pub(crate) fn tsx(cpu: &mut Cpu) -> u32 {
    cpu.x = cpu.sp;
    cpu.p.update_zn(cpu.x);
    0
}

pub(crate) fn txs(cpu: &mut Cpu) -> u32 {
    cpu.sp = cpu.x;
    0
}
