//! # 6502 Instruction Implementations
//!
//! Instructions are grouped by category. [`execute`] resolves the operand
//! for the addressing mode, then dispatches on the mnemonic.
//!
//! ## Categories
//!
//! - **alu**: ADC, SBC, AND, ORA, EOR, CMP, CPX, CPY, BIT
//! - **branches**: BCC, BCS, BEQ, BNE, BMI, BPL, BVC, BVS
//! - **shifts**: ASL, LSR, ROL, ROR
//! - **load_store**: LDA, LDX, LDY, STA, STX, STY
//! - **inc_dec**: INC, DEC, INX, INY, DEX, DEY
//! - **control**: JMP, JSR, RTS, RTI, BRK, NOP
//! - **stack**: PHA, PHP, PLA, PLP
//! - **flags**: CLC, SEC, CLI, SEI, CLD, SED, CLV
//! - **transfer**: TAX, TAY, TXA, TYA, TSX, TXS
//! - **undocumented**: the NMOS opcodes outside the official set
//!
//! ## Bus traffic
//!
//! Besides the accesses an instruction needs, the CPU performs the dummy
//! accesses the silicon does, since reads of chip registers can have side
//! effects:
//!
//! - indexed zero-page modes read the unindexed zero-page address;
//! - indexed absolute modes read the address with the unfixed high byte when
//!   the index crosses a page, and always do so for writes and
//!   read-modify-write;
//! - read-modify-write instructions write the unmodified value back before
//!   writing the result (this is what acknowledges `INC $D019`);
//! - implied and accumulator instructions read the byte after the opcode.

mod alu;
mod branches;
mod control;
mod flags;
mod inc_dec;
mod load_store;
mod shifts;
mod stack;
mod transfer;
mod undocumented;

use crate::addressing::AddressingMode;
use crate::cpu::Cpu;
use crate::memory::MemoryBus;
use crate::opcodes::{Instruction, Mnemonic, OperandUse};
use crate::registers::Flag;

/// Resolved operand of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operand {
    None,
    Accumulator,
    Immediate(u8),
    Memory { address: u16, page_crossed: bool },
    Branch(i8),
}

/// Executes `instr`, whose opcode has already been fetched. Returns the
/// cycles on top of the instruction's base count.
pub(crate) fn execute<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B, instr: &Instruction) -> u32 {
    use Mnemonic::*;

    let op = resolve(cpu, bus, instr.mode, instr.mnemonic.operand_use());
    let penalty = match op {
        Operand::Memory {
            page_crossed: true, ..
        } if instr.page_penalty => 1,
        _ => 0,
    };

    let extra = match instr.mnemonic {
        Adc => alu::adc(cpu, bus, op),
        Sbc => alu::sbc(cpu, bus, op),
        And => alu::and(cpu, bus, op),
        Ora => alu::ora(cpu, bus, op),
        Eor => alu::eor(cpu, bus, op),
        Cmp => {
            let register = cpu.a;
            alu::compare(cpu, bus, op, register)
        }
        Cpx => {
            let register = cpu.x;
            alu::compare(cpu, bus, op, register)
        }
        Cpy => {
            let register = cpu.y;
            alu::compare(cpu, bus, op, register)
        }
        Bit => alu::bit(cpu, bus, op),

        Bcc => {
            let taken = !cpu.p.carry();
            branches::branch(cpu, taken, op)
        }
        Bcs => {
            let taken = cpu.p.carry();
            branches::branch(cpu, taken, op)
        }
        Bne => {
            let taken = !cpu.p.zero();
            branches::branch(cpu, taken, op)
        }
        Beq => {
            let taken = cpu.p.zero();
            branches::branch(cpu, taken, op)
        }
        Bpl => {
            let taken = !cpu.p.negative();
            branches::branch(cpu, taken, op)
        }
        Bmi => {
            let taken = cpu.p.negative();
            branches::branch(cpu, taken, op)
        }
        Bvc => {
            let taken = !cpu.p.overflow();
            branches::branch(cpu, taken, op)
        }
        Bvs => {
            let taken = cpu.p.overflow();
            branches::branch(cpu, taken, op)
        }

        Asl => shifts::asl(cpu, bus, op),
        Lsr => shifts::lsr(cpu, bus, op),
        Rol => shifts::rol(cpu, bus, op),
        Ror => shifts::ror(cpu, bus, op),

        Lda => load_store::lda(cpu, bus, op),
        Ldx => load_store::ldx(cpu, bus, op),
        Ldy => load_store::ldy(cpu, bus, op),
        Sta => load_store::store(bus, op, cpu.a),
        Stx => load_store::store(bus, op, cpu.x),
        Sty => load_store::store(bus, op, cpu.y),

        Inc => inc_dec::inc(cpu, bus, op),
        Dec => inc_dec::dec(cpu, bus, op),
        Inx => inc_dec::inx(cpu),
        Iny => inc_dec::iny(cpu),
        Dex => inc_dec::dex(cpu),
        Dey => inc_dec::dey(cpu),

        Jmp => control::jmp(cpu, op),
        Jsr => control::jsr(cpu, bus, op),
        Rts => control::rts(cpu, bus),
        Rti => control::rti(cpu, bus),
        Brk => control::brk(cpu, bus),
        Nop => control::nop(cpu, bus, op),
        Jam => 0,

        Pha => stack::pha(cpu, bus),
        Php => stack::php(cpu, bus),
        Pla => stack::pla(cpu, bus),
        Plp => stack::plp(cpu, bus),

        Clc => flags::set(cpu, Flag::Carry, false),
        Sec => flags::set(cpu, Flag::Carry, true),
        Cli => flags::set(cpu, Flag::InterruptDisable, false),
        Sei => flags::set(cpu, Flag::InterruptDisable, true),
        Cld => flags::set(cpu, Flag::Decimal, false),
        Sed => flags::set(cpu, Flag::Decimal, true),
        Clv => flags::set(cpu, Flag::Overflow, false),

        Tax => transfer::tax(cpu),
        Tay => transfer::tay(cpu),
        Txa => transfer::txa(cpu),
        Tya => transfer::tya(cpu),
        Tsx => transfer::tsx(cpu),
        Txs => transfer::txs(cpu),

        Slo => undocumented::slo(cpu, bus, op),
        Rla => undocumented::rla(cpu, bus, op),
        Sre => undocumented::sre(cpu, bus, op),
        Rra => undocumented::rra(cpu, bus, op),
        Sax => load_store::store(bus, op, cpu.a & cpu.x),
        Lax => undocumented::lax(cpu, bus, op),
        Dcp => undocumented::dcp(cpu, bus, op),
        Isc => undocumented::isc(cpu, bus, op),
        Anc => undocumented::anc(cpu, bus, op),
        Alr => undocumented::alr(cpu, bus, op),
        Arr => undocumented::arr(cpu, bus, op),
        Xaa => undocumented::xaa(cpu, bus, op),
        Lxa => undocumented::lxa(cpu, bus, op),
        Sbx => undocumented::sbx(cpu, bus, op),
        Las => undocumented::las(cpu, bus, op),
        Tas => undocumented::tas(cpu, bus, op),
        Shx => undocumented::unstable_store(bus, op, cpu.x),
        Shy => undocumented::unstable_store(bus, op, cpu.y),
        Ahx => undocumented::unstable_store(bus, op, cpu.a & cpu.x),
    };

    penalty + extra
}

/// Fetches operand bytes and computes the effective address, performing
/// the dummy reads for the mode.
fn resolve<B: MemoryBus>(
    cpu: &mut Cpu,
    bus: &mut B,
    mode: AddressingMode,
    usage: OperandUse,
) -> Operand {
    use AddressingMode::*;

    match mode {
        Implicit => {
            bus.read(cpu.pc.value());
            Operand::None
        }
        Accumulator => {
            bus.read(cpu.pc.value());
            Operand::Accumulator
        }
        Immediate => Operand::Immediate(bus.read(cpu.pc.take())),
        Relative => Operand::Branch(bus.read(cpu.pc.take()) as i8),
        ZeroPage => Operand::Memory {
            address: bus.read(cpu.pc.take()) as u16,
            page_crossed: false,
        },
        ZeroPageX | ZeroPageY => {
            let base = bus.read(cpu.pc.take());
            bus.read(base as u16);
            let index = if mode == ZeroPageX { cpu.x } else { cpu.y };
            Operand::Memory {
                address: base.wrapping_add(index) as u16,
                page_crossed: false,
            }
        }
        Absolute => Operand::Memory {
            address: fetch_word(cpu, bus),
            page_crossed: false,
        },
        AbsoluteX | AbsoluteY => {
            let base = fetch_word(cpu, bus);
            let index = if mode == AbsoluteX { cpu.x } else { cpu.y };
            indexed(bus, base, index, usage)
        }
        Indirect => {
            let pointer = fetch_word(cpu, bus);
            // The high byte never carries into the next page.
            let high_at = (pointer & 0xFF00) | (pointer.wrapping_add(1) & 0x00FF);
            let low = bus.read(pointer);
            let high = bus.read(high_at);
            Operand::Memory {
                address: u16::from_le_bytes([low, high]),
                page_crossed: false,
            }
        }
        IndirectX => {
            let zp = bus.read(cpu.pc.take());
            bus.read(zp as u16);
            let pointer = zp.wrapping_add(cpu.x);
            Operand::Memory {
                address: read_zero_page_word(bus, pointer),
                page_crossed: false,
            }
        }
        IndirectY => {
            let zp = bus.read(cpu.pc.take());
            let base = read_zero_page_word(bus, zp);
            indexed(bus, base, cpu.y, usage)
        }
    }
}

fn indexed<B: MemoryBus>(bus: &mut B, base: u16, index: u8, usage: OperandUse) -> Operand {
    let address = base.wrapping_add(index as u16);
    let page_crossed = (base & 0xFF00) != (address & 0xFF00);
    if page_crossed || usage != OperandUse::Read {
        bus.read((base & 0xFF00) | (address & 0x00FF));
    }
    Operand::Memory {
        address,
        page_crossed,
    }
}

fn fetch_word<B: MemoryBus>(cpu: &mut Cpu, bus: &mut B) -> u16 {
    let low = bus.read(cpu.pc.take());
    let high = bus.read(cpu.pc.take());
    u16::from_le_bytes([low, high])
}

fn read_zero_page_word<B: MemoryBus>(bus: &mut B, pointer: u8) -> u16 {
    let low = bus.read(pointer as u16);
    let high = bus.read(pointer.wrapping_add(1) as u16);
    u16::from_le_bytes([low, high])
}

/// Value of a read operand.
pub(crate) fn load<B: MemoryBus>(cpu: &Cpu, bus: &mut B, op: Operand) -> u8 {
    match op {
        Operand::Immediate(value) => value,
        Operand::Memory { address, .. } => bus.read(address),
        Operand::Accumulator => cpu.a,
        Operand::None | Operand::Branch(_) => 0,
    }
}

/// Read-modify-write on A or memory. Memory operands see the unmodified
/// value written back before the result.
pub(crate) fn modify<B, F>(cpu: &mut Cpu, bus: &mut B, op: Operand, f: F) -> u8
where
    B: MemoryBus,
    F: FnOnce(&mut Cpu, u8) -> u8,
{
    match op {
        Operand::Accumulator => {
            let value = cpu.a;
            let result = f(cpu, value);
            cpu.a = result;
            result
        }
        Operand::Memory { address, .. } => {
            let value = bus.read(address);
            bus.write(address, value);
            let result = f(cpu, value);
            bus.write(address, result);
            result
        }
        Operand::None | Operand::Immediate(_) | Operand::Branch(_) => 0,
    }
}
