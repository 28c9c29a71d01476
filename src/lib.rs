//! # MOS Machine
//!
//! A cycle-counted 8-bit home computer core: an NMOS 6502/6510 CPU, a
//! banked memory model with per-observer views, clock-driven peripheral
//! chips and a paced master clock, tied together by [`Computer`].
//!
//! ## Quick Start
//!
//! ```rust
//! use mos_machine::{presets, Computer, RunExit};
//!
//! let mut config = presets::flat_ram();
//! config.clock.throttled = false;
//! let mut computer = Computer::new(config).unwrap();
//!
//! // LDX #$00; loop: INX; BNE loop; JAM
//! computer
//!     .load_program(&[0xA2, 0x00, 0xE8, 0xD0, 0xFD, 0x02], 0x0200)
//!     .unwrap();
//!
//! let summary = computer.run_until(|_| false).unwrap();
//! assert_eq!(summary.exit, RunExit::Halted);
//! assert_eq!(computer.cpu().x(), 0x00);
//! assert_eq!(summary.instructions, 1 + 256 * 2 + 1);
//! ```
//!
//! ## Architecture
//!
//! - [`cpu`]: registers, fetch/decode/execute, interrupt entry. The CPU
//!   executes against any [`MemoryBus`]; [`FlatMemory`] is enough for
//!   testing instructions on their own.
//! - [`memory`]: physical storages, subsets that window them into the
//!   address space, and views (the CPU's, a video chip's) that map subsets.
//! - [`chips`]: the processor port, CIA-style timer chips and a VIC-style
//!   raster chip. Chips own register windows, drive the interrupt lines and
//!   switch banks.
//! - [`bus`]: routes CPU accesses through the active view to storage or to
//!   chip registers.
//! - [`clock`]: video standards and wall-clock pacing.
//! - [`computer`]: builds a machine from a [`config::MachineConfig`] and
//!   steps CPU and chips in lockstep.
//!
//! ## Logging
//!
//! The crate reports through [`tracing`] and installs no subscriber.
//! Unmapped accesses and bank switches are `trace`, interrupt entry and
//! remaps `debug`, machine construction `info`, CPU halts `warn`.

pub mod address;
pub mod addressing;
pub mod bus;
pub mod chips;
pub mod clock;
pub mod computer;
pub mod config;
pub mod cpu;
pub mod interrupts;
pub mod memory;
pub mod numeric;
pub mod opcodes;
pub mod presets;
pub mod registers;

#[cfg(feature = "wasm")]
pub mod wasm;

// Instruction implementations (not part of public API)
mod instructions;

use thiserror::Error;

pub use address::Address;
pub use addressing::AddressingMode;
pub use bus::Bus;
pub use chips::{Chip, ChipOutput, IoPort, RasterChip, TimerChip};
pub use clock::{Clock, ControlHandle, VideoStandard};
pub use computer::{Computer, ResetLevel, RunExit, RunSummary};
pub use config::{ConfigError, MachineConfig};
pub use cpu::{Cpu, CpuRegisters, CpuState, IllegalOpcodePolicy};
pub use interrupts::CpuInterrupt;
pub use memory::{FlatMemory, Memory, MemoryBus, MemoryError};
pub use opcodes::{Instruction, Mnemonic, OPCODE_TABLE};
pub use registers::{Flag, StatusRegister};

/// Errors raised while executing instructions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// An undocumented opcode under [`IllegalOpcodePolicy::Halt`]. The CPU
    /// is halted on it.
    #[error("illegal opcode ${opcode:02X} at {address}")]
    IllegalOpcode { opcode: u8, address: Address },

    /// The CPU is halted and must be reset before it runs again.
    #[error("cpu halted at {address}")]
    Halted { address: Address },
}
