//! # Flag Instructions
//!
//! CLC, SEC, CLI, SEI, CLD, SED, CLV.

use crate::cpu::Cpu;
use crate::registers::Flag;

pub(crate) fn set(cpu: &mut Cpu, flag: Flag, value: bool) -> u32 {
    cpu.p.set(flag, value);
    0
}
