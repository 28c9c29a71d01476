//! # Branch Instructions
//!
//! A taken branch costs one cycle, plus one more when the target lies in
//! a different page from the next instruction.

use super::Operand;
use crate::cpu::Cpu;

pub(crate) fn branch(cpu: &mut Cpu, taken: bool, op: Operand) -> u32 {
    let Operand::Branch(offset) = op else {
        return 0;
    };
    if !taken {
        return 0;
    }
    let from = cpu.pc.value();
    let to = from.wrapping_add_signed(offset as i16);
    cpu.pc.set(to);
    if from & 0xFF00 != to & 0xFF00 {
        2
    } else {
        1
    }
}
