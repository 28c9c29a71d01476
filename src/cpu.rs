//! # CPU State and Execution
//!
//! The NMOS 6502/6510 core: registers, the fetch/decode/execute cycle and
//! interrupt entry.
//!
//! ## State machine
//!
//! ```text
//! Fetching -> Executing -> (ServicingInterrupt) -> Fetching
//!                 |
//!                 +--> Halted   (JAM opcode, or an undocumented opcode
//!                                under IllegalOpcodePolicy::Halt)
//! ```
//!
//! One [`Cpu::step`] runs one instruction to completion and then looks at the
//! interrupt lines. If an NMI edge was latched, or IRQ is asserted and not
//! masked, the CPU enters the handler within the same step (7 more cycles).
//! A halted CPU consumes no cycles until it is reset.
//!
//! The CPU does not own memory. Every call takes the bus it executes
//! against, so the same core runs on a [`FlatMemory`](crate::FlatMemory) in
//! tests and on the banked machine bus inside a
//! [`Computer`](crate::Computer).

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address::Address;
use crate::instructions;
use crate::interrupts::CpuInterrupt;
use crate::memory::MemoryBus;
use crate::numeric::UByte;
use crate::opcodes::{Mnemonic, OPCODE_TABLE};
use crate::registers::{Flag, ProgramCounter, StatusRegister};
use crate::ExecutionError;

/// Where the CPU is in its instruction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuState {
    Fetching,
    Executing,
    ServicingInterrupt,
    Halted,
}

/// What to do with undocumented opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IllegalOpcodePolicy {
    /// Execute them as NMOS silicon does.
    #[default]
    Emulate,
    /// Raise [`ExecutionError::IllegalOpcode`] and halt.
    Halt,
}

/// Register snapshot for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuRegisters {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: StatusRegister,
}

impl std::fmt::Display for CpuRegisters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PC=${:04X} A=${:02X} X=${:02X} Y=${:02X} SP=${:02X} P={}",
            self.pc, self.a, self.x, self.y, self.sp, self.status
        )
    }
}

/// 6502 CPU state.
///
/// # Examples
///
/// ```
/// use mos_machine::{Cpu, FlatMemory, MemoryBus};
///
/// let mut memory = FlatMemory::new();
/// memory.write(0xFFFC, 0x00);
/// memory.write(0xFFFD, 0x80);
/// memory.load(0x8000, &[0xA9, 0x42]); // LDA #$42
///
/// let mut cpu = Cpu::power_on(&mut memory);
/// assert_eq!(cpu.sp(), 0xFD);
/// assert!(cpu.flag_i());
///
/// let cycles = cpu.step(&mut memory).unwrap();
/// assert_eq!(cycles, 2);
/// assert_eq!(cpu.a(), 0x42);
/// ```
#[derive(Debug, Clone)]
pub struct Cpu {
    pub(crate) a: u8,
    pub(crate) x: u8,
    pub(crate) y: u8,
    /// Offset into page one; the stack lives at `0x0100 | sp`.
    pub(crate) sp: u8,
    pub(crate) pc: ProgramCounter,
    pub(crate) p: StatusRegister,

    cycles: u64,
    instructions: u64,
    state: CpuState,
    policy: IllegalOpcodePolicy,

    /// Last sampled NMI level, for edge detection.
    nmi_line: bool,
    nmi_pending: bool,
    irq_requested: bool,
    reset_pending: bool,
}

impl Cpu {
    /// A CPU in its power-on register state. PC is zero until
    /// [`Cpu::reset`] or [`Cpu::power_on`] loads the reset vector.
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: ProgramCounter::new(0),
            p: StatusRegister::new(),
            cycles: 0,
            instructions: 0,
            state: CpuState::Fetching,
            policy: IllegalOpcodePolicy::default(),
            nmi_line: false,
            nmi_pending: false,
            irq_requested: false,
            reset_pending: false,
        }
    }

    /// Power-on state with PC loaded from the reset vector at $FFFC/$FFFD.
    /// No cycles are counted.
    pub fn power_on<B: MemoryBus>(bus: &mut B) -> Self {
        let mut cpu = Self::new();
        cpu.pc.set(cpu.read_vector(bus, CpuInterrupt::Reset.vector()));
        cpu
    }

    pub fn with_policy(mut self, policy: IllegalOpcodePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> IllegalOpcodePolicy {
        self.policy
    }

    /// Runs the reset sequence: SP drops by three, I is set, PC comes from
    /// the reset vector. Clears a halt and any latched requests.
    pub fn reset<B: MemoryBus>(&mut self, bus: &mut B) -> u32 {
        self.sp = self.sp.wrapping_sub(3);
        self.p.set(Flag::InterruptDisable, true);
        self.pc.set(self.read_vector(bus, CpuInterrupt::Reset.vector()));
        self.state = CpuState::Fetching;
        self.nmi_pending = false;
        self.irq_requested = false;
        self.reset_pending = false;
        self.cycles += CpuInterrupt::SERVICE_CYCLES as u64;
        debug!(pc = %Address::new(self.pc.value()), "cpu reset");
        CpuInterrupt::SERVICE_CYCLES
    }

    /// Latches an interrupt request raised from outside the bus. IRQ stays
    /// latched until serviced; NMI is taken at the next boundary; reset runs
    /// at the start of the next step.
    pub fn request_interrupt(&mut self, kind: CpuInterrupt) {
        match kind {
            CpuInterrupt::Irq => self.irq_requested = true,
            CpuInterrupt::Nmi => self.nmi_pending = true,
            CpuInterrupt::Reset => self.reset_pending = true,
        }
    }

    /// Executes one instruction, then services a pending interrupt if one is
    /// due. Returns the cycles consumed.
    ///
    /// # Errors
    ///
    /// - [`ExecutionError::Halted`] if the CPU is halted (no cycles used).
    /// - [`ExecutionError::IllegalOpcode`] for an undocumented opcode under
    ///   [`IllegalOpcodePolicy::Halt`]; the CPU halts on it.
    pub fn step<B: MemoryBus>(&mut self, bus: &mut B) -> Result<u32, ExecutionError> {
        if self.reset_pending {
            return Ok(self.reset(bus));
        }
        if self.state == CpuState::Halted {
            return Err(ExecutionError::Halted {
                address: Address::new(self.pc.value()),
            });
        }

        self.state = CpuState::Fetching;
        let address = self.pc.value();
        let opcode = bus.read(self.pc.take());
        let instr = &OPCODE_TABLE[opcode as usize];

        if !instr.documented && !instr.is_jam() && self.policy == IllegalOpcodePolicy::Halt {
            self.pc.set(address);
            self.state = CpuState::Halted;
            warn!(
                opcode = %UByte::new(opcode),
                pc = %Address::new(address),
                "illegal opcode, cpu halted"
            );
            return Err(ExecutionError::IllegalOpcode {
                opcode,
                address: Address::new(address),
            });
        }

        self.state = CpuState::Executing;
        let masked_before = self.p.interrupt_disable();
        let mut cycles = instr.cycles as u32 + instructions::execute(self, bus, instr);
        self.cycles += cycles as u64;
        self.instructions += 1;

        if instr.is_jam() {
            self.pc.set(address);
            self.state = CpuState::Halted;
            warn!(opcode = %UByte::new(opcode), pc = %Address::new(address), "JAM, cpu halted");
            return Ok(cycles);
        }

        // CLI/SEI/PLP change I after the interrupt poll.
        let masked = match instr.mnemonic {
            Mnemonic::Cli | Mnemonic::Sei | Mnemonic::Plp => masked_before,
            _ => self.p.interrupt_disable(),
        };
        cycles += self.poll_interrupts(bus, masked);
        self.state = CpuState::Fetching;
        Ok(cycles)
    }

    /// Steps until at least `cycle_budget` cycles have run. Returns the
    /// cycles actually consumed, which may overshoot by part of an
    /// instruction.
    pub fn run_for_cycles<B: MemoryBus>(
        &mut self,
        bus: &mut B,
        cycle_budget: u64,
    ) -> Result<u64, ExecutionError> {
        let mut used = 0u64;
        while used < cycle_budget {
            used += self.step(bus)? as u64;
        }
        Ok(used)
    }

    fn poll_interrupts<B: MemoryBus>(&mut self, bus: &mut B, masked: bool) -> u32 {
        let nmi = bus.nmi_active();
        if nmi && !self.nmi_line {
            self.nmi_pending = true;
        }
        self.nmi_line = nmi;

        if self.nmi_pending {
            self.nmi_pending = false;
            return self.service(bus, CpuInterrupt::Nmi);
        }
        if !masked && (self.irq_requested || bus.irq_active()) {
            self.irq_requested = false;
            return self.service(bus, CpuInterrupt::Irq);
        }
        0
    }

    fn service<B: MemoryBus>(&mut self, bus: &mut B, kind: CpuInterrupt) -> u32 {
        self.state = CpuState::ServicingInterrupt;
        let return_to = self.pc.value();
        self.push_word(bus, return_to);
        self.push(bus, self.p.pushed_by_hardware());
        self.p.set(Flag::InterruptDisable, true);
        self.pc.set(self.read_vector(bus, kind.vector()));
        self.cycles += CpuInterrupt::SERVICE_CYCLES as u64;
        debug!(
            %kind,
            from = %Address::new(return_to),
            handler = %Address::new(self.pc.value()),
            "servicing interrupt"
        );
        CpuInterrupt::SERVICE_CYCLES
    }

    pub(crate) fn read_vector<B: MemoryBus>(&self, bus: &mut B, vector: u16) -> u16 {
        let low = bus.read(vector);
        let high = bus.read(vector.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    pub(crate) fn push<B: MemoryBus>(&mut self, bus: &mut B, value: u8) {
        bus.write(0x0100 | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn pull<B: MemoryBus>(&mut self, bus: &mut B) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 | self.sp as u16)
    }

    pub(crate) fn push_word<B: MemoryBus>(&mut self, bus: &mut B, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.push(bus, high);
        self.push(bus, low);
    }

    pub(crate) fn pull_word<B: MemoryBus>(&mut self, bus: &mut B) -> u16 {
        let low = self.pull(bus);
        let high = self.pull(bus);
        u16::from_le_bytes([low, high])
    }

    // ========== Inspection ==========

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn pc(&self) -> u16 {
        self.pc.value()
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    /// Status register packed as `NV1BDIZC` (B reads as 0).
    pub fn status(&self) -> u8 {
        self.p.bits()
    }

    pub fn status_register(&self) -> StatusRegister {
        self.p
    }

    /// Total cycles consumed, including interrupt entry.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Instructions executed.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    pub fn state(&self) -> CpuState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    pub fn registers(&self) -> CpuRegisters {
        CpuRegisters {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc.value(),
            status: self.p,
        }
    }

    pub fn flag_n(&self) -> bool {
        self.p.negative()
    }

    pub fn flag_v(&self) -> bool {
        self.p.overflow()
    }

    pub fn flag_d(&self) -> bool {
        self.p.decimal()
    }

    pub fn flag_i(&self) -> bool {
        self.p.interrupt_disable()
    }

    pub fn flag_z(&self) -> bool {
        self.p.zero()
    }

    pub fn flag_c(&self) -> bool {
        self.p.carry()
    }

    // ========== Test and loader hooks ==========

    pub fn set_a(&mut self, value: u8) {
        self.a = value;
    }

    pub fn set_x(&mut self, value: u8) {
        self.x = value;
    }

    pub fn set_y(&mut self, value: u8) {
        self.y = value;
    }

    pub fn set_sp(&mut self, value: u8) {
        self.sp = value;
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc.set(value);
    }

    /// Loads P from a byte (B dropped, bit 5 forced).
    pub fn set_status(&mut self, value: u8) {
        self.p = StatusRegister::from_pulled(value);
    }

    pub fn set_flag(&mut self, flag: Flag, value: bool) {
        self.p.set(flag, value);
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
