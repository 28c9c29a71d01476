//! # Computer
//!
//! Owns the CPU, the bus (memory plus chips) and the clock, and is the one
//! place that advances time. A [`Computer::step`]:
//!
//! 1. honours pending control requests (reset) at the instruction boundary;
//! 2. runs exactly one CPU instruction, including any interrupt entry it
//!    ends with;
//! 3. simulates every chip, in configuration order, for the cycles the CPU
//!    just consumed;
//! 4. paces against wall time.
//!
//! Interrupts the chips raise in step 3 are seen by the CPU when it polls
//! at the end of the next instruction.

use tracing::{debug, info};

use crate::address::Address;
use crate::bus::Bus;
use crate::chips::{BankSwitch, Chip, ChipId, ChipOutput, IoPort, RasterChip, TimerChip};
use crate::clock::{Clock, ControlHandle};
use crate::config::{BankConfig, ChipKind, ConfigError, MachineConfig};
use crate::cpu::{Cpu, CpuRegisters};
use crate::interrupts::CpuInterrupt;
use crate::memory::{Memory, MemoryBus, MemoryError, SubsetId, ViewId, ViewSnapshot};
use crate::numeric::{Format, UBytes, UInt};
use crate::ExecutionError;

/// Why a run returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The predicate returned true.
    ConditionMet,
    /// The CPU is halted (JAM) and needs a reset.
    Halted,
    /// A stop was requested through the [`ControlHandle`].
    Stopped,
}

/// How much of the machine a reset touches. Ordered weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ResetLevel {
    /// The CPU's reset sequence only. Chips, banking and RAM are kept.
    Cpu,
    /// CPU reset plus the configured view layout and chip power-on state.
    /// RAM keeps its contents.
    #[default]
    Machine,
    /// A machine reset with RAM wiped to zero. ROM is kept.
    ColdStart,
}

/// What a run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub instructions: u64,
    pub exit: RunExit,
}

/// A complete machine.
pub struct Computer {
    name: String,
    cpu: Cpu,
    bus: Bus,
    clock: Clock,
    control: ControlHandle,
    stop_pending: bool,
    cpu_view: ViewId,
    layout: ViewSnapshot,
}

impl Computer {
    /// Builds a machine from its description, resets the chips (which
    /// selects their initial banks) and powers the CPU on through the
    /// reset vector.
    ///
    /// # Errors
    ///
    /// Any unresolved name, duplicate name, subset that does not fit its
    /// storage, overlapping initial mapping, bank table with a conflicting
    /// configuration, or unusable speed factor.
    pub fn new(config: MachineConfig) -> Result<Self, ConfigError> {
        config.check_names()?;
        config.clock.check()?;
        let mut memory = Memory::new();
        memory.set_open_bus(config.open_bus);

        for storage in &config.storages {
            memory.add_storage(&storage.name, storage.kind, storage.size, storage.fill);
        }
        for subset in &config.subsets {
            let storage = find_storage(&memory, &subset.storage)?;
            memory.add_subset(
                &subset.name,
                storage,
                subset.offset,
                Address::new(subset.start),
                subset.len,
                subset.access,
            )?;
        }
        for subset in &config.subsets {
            if let Some(target) = &subset.write_through {
                let from = find_subset(&memory, &subset.name)?;
                let to = find_subset(&memory, target)?;
                memory.set_write_through(from, to)?;
            }
        }
        // Chips get ids in configuration order, matching the order the bus
        // registers them below.
        for (index, chip) in config.chips.iter().enumerate() {
            if let Some(window) = chip.registers {
                memory.add_register_window(
                    &chip.name,
                    ChipId(index),
                    Address::new(window.start),
                    window.len,
                )?;
            }
        }
        for view in &config.views {
            let id = memory.add_view(&view.name);
            for name in &view.map {
                let subset = find_subset(&memory, name)?;
                memory.map(subset, id)?;
            }
        }
        let cpu_view = find_view(&memory, &config.cpu_view)?;
        memory.set_active_view(cpu_view)?;

        let mut chips: Vec<Box<dyn Chip>> = Vec::with_capacity(config.chips.len());
        for chip in &config.chips {
            chips.push(build_chip(&memory, &config, &chip.name, &chip.kind)?);
        }

        let layout = memory.snapshot_views();
        let mut bus = Bus::new(memory);
        for (chip, boxed) in config.chips.iter().zip(chips) {
            bus.add_chip(&chip.name, boxed);
        }
        bus.reset_chips();

        let cpu = Cpu::power_on(&mut bus).with_policy(config.illegal_opcodes);
        let clock = Clock::new(
            config.clock.standard,
            config.clock.speed_factor,
            config.clock.throttled,
        );

        info!(
            name = %config.name,
            storages = config.storages.len(),
            subsets = config.subsets.len(),
            chips = config.chips.len(),
            views = config.views.len(),
            standard = ?config.clock.standard,
            pc = %Address::new(cpu.pc()),
            "machine built"
        );

        Ok(Self {
            name: config.name,
            cpu,
            bus,
            clock,
            control: ControlHandle::new(),
            stop_pending: false,
            cpu_view,
            layout,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ========== Control ==========

    /// A handle that can stop or reset this machine from another thread.
    pub fn control_handle(&self) -> ControlHandle {
        self.control.clone()
    }

    fn service_requests(&mut self) {
        let requests = self.control.take();
        if let Some(level) = requests.reset {
            self.reset(level);
        }
        if requests.stop {
            self.stop_pending = true;
        }
    }

    /// Runs one instruction plus the chip cycles it implies. Returns the
    /// cycles consumed (instruction plus interrupt entry).
    ///
    /// # Errors
    ///
    /// Whatever [`Cpu::step`] raises; on error no chip time passes.
    pub fn step(&mut self) -> Result<u32, ExecutionError> {
        self.service_requests();
        let cycles = self.cpu.step(&mut self.bus)?;
        self.bus.simulate_chips(cycles);
        self.clock.pace(cycles, &self.control);
        Ok(cycles)
    }

    /// Steps until `done` returns true, the CPU halts, or a stop is
    /// requested. `done` is checked before every instruction.
    pub fn run_until<F>(&mut self, mut done: F) -> Result<RunSummary, ExecutionError>
    where
        F: FnMut(&Computer) -> bool,
    {
        let start_cycles = self.cpu.cycles();
        let start_instructions = self.cpu.instructions();
        let exit = loop {
            self.service_requests();
            if std::mem::take(&mut self.stop_pending) {
                break RunExit::Stopped;
            }
            if self.cpu.is_halted() {
                break RunExit::Halted;
            }
            if done(self) {
                break RunExit::ConditionMet;
            }
            self.step()?;
        };
        let summary = RunSummary {
            cycles: self.cpu.cycles() - start_cycles,
            instructions: self.cpu.instructions() - start_instructions,
            exit,
        };
        debug!(
            exit = ?summary.exit,
            cycles = summary.cycles,
            instructions = summary.instructions,
            "run finished"
        );
        Ok(summary)
    }

    /// Runs until at least `budget` cycles have passed. May overshoot by
    /// part of an instruction.
    pub fn run_for_cycles(&mut self, budget: u64) -> Result<RunSummary, ExecutionError> {
        let target = self.cpu.cycles() + budget;
        self.run_until(|computer| computer.cpu.cycles() >= target)
    }

    /// Resets the machine at `level`. Above [`ResetLevel::Cpu`], views
    /// return to their configured layout and chips to their power-on state
    /// (re-selecting banks) before the CPU's reset sequence runs. Returns
    /// the CPU's reset cycles.
    pub fn reset(&mut self, level: ResetLevel) -> u32 {
        if level >= ResetLevel::Machine {
            let memory = self.bus.memory_mut();
            memory.restore_views(&self.layout);
            if level == ResetLevel::ColdStart {
                memory.clear_ram(0x00);
            }
            self.bus.reset_chips();
        }
        let cycles = self.cpu.reset(&mut self.bus);
        self.clock.restart();
        info!(?level, pc = %Address::new(self.cpu.pc()), "machine reset");
        cycles
    }

    /// Latches an interrupt on the CPU, independent of any chip. It is
    /// taken at the next instruction boundary.
    pub fn request_interrupt(&mut self, kind: CpuInterrupt) {
        debug!(%kind, "external interrupt requested");
        self.cpu.request_interrupt(kind);
    }

    // ========== Loading ==========

    /// Writes `bytes` at `start` through the CPU view. Nothing is written
    /// unless every byte lands somewhere writable.
    ///
    /// Bytes go over the bus like CPU stores. One landing in a chip's
    /// register window has that register's side effects: a store to a
    /// processor port switches banks, one to a timer's control register
    /// starts it. Use [`Computer::load_storage`] to fill memory without
    /// touching chips.
    ///
    /// # Errors
    ///
    /// [`MemoryError::OutOfRange`] past $FFFF, [`MemoryError::ReadOnlyTarget`]
    /// for a byte that would hit ROM or nothing.
    pub fn load(&mut self, bytes: &[u8], start: u16) -> Result<(), MemoryError> {
        let address = Address::new(start);
        address.check_span(bytes.len())?;
        self.bus.memory().check_writable(address, bytes.len(), self.cpu_view)?;
        for (i, byte) in bytes.iter().enumerate() {
            self.bus.write(start.wrapping_add(i as u16), *byte);
        }
        debug!(start = %address, len = bytes.len(), "bytes loaded");
        Ok(())
    }

    /// [`Computer::load`], then points the CPU at the first byte.
    pub fn load_program(&mut self, bytes: &[u8], start: u16) -> Result<(), MemoryError> {
        self.load(bytes, start)?;
        self.cpu.set_pc(start);
        Ok(())
    }

    /// Fills a physical storage from its first byte, whatever its kind.
    /// This is how ROM images are installed.
    pub fn load_storage(&mut self, name: &str, bytes: &[u8]) -> Result<(), ConfigError> {
        let id = find_storage(self.bus.memory(), name)?;
        self.bus.memory_mut().storage_mut(id)?.load(0, bytes)?;
        debug!(storage = name, len = bytes.len(), "storage image loaded");
        Ok(())
    }

    /// Hands a chip's output (frames) to `sink`.
    pub fn subscribe<F>(&mut self, chip: &str, sink: F) -> Result<(), ConfigError>
    where
        F: FnMut(&ChipOutput<'_>) + 'static,
    {
        let id = self
            .bus
            .find_chip(chip)
            .ok_or_else(|| ConfigError::UnknownChip(chip.to_string()))?;
        self.bus.set_sink(id, Box::new(sink));
        Ok(())
    }

    // ========== Inspection ==========

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn registers(&self) -> CpuRegisters {
        self.cpu.registers()
    }

    pub fn memory(&self) -> &Memory {
        self.bus.memory()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The view the CPU currently executes against.
    pub fn active_view(&self) -> ViewId {
        self.cpu_view
    }

    /// Names of the subsets the CPU view currently maps, lowest address
    /// first.
    pub fn active_subsets(&self) -> Vec<&str> {
        let memory = self.bus.memory();
        memory
            .view(self.cpu_view)
            .map(|view| {
                view.mapped()
                    .filter_map(|id| memory.subset(id).ok().map(|s| s.name()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Bytes as the CPU would read them, without side effects.
    pub fn dump(&self, start: u16, len: usize) -> Result<UBytes, MemoryError> {
        Address::new(start).check_span(len)?;
        let bytes: Vec<u8> = (0..len)
            .map(|i| self.bus.peek(start.wrapping_add(i as u16)))
            .collect();
        Ok(UBytes::from(bytes))
    }

    /// Reads a `width`-byte little-endian value.
    pub fn read_value(
        &self,
        start: u16,
        width: usize,
        format: Format,
    ) -> Result<UInt, MemoryError> {
        let bytes = self.dump(start, width)?;
        UInt::from_bytes(bytes, format).ok_or(MemoryError::OutOfRange {
            start: start as usize,
            len: width,
        })
    }

    /// Typed access to a chip by name.
    pub fn chip<T: Chip>(&self, name: &str) -> Option<&T> {
        let id = self.bus.find_chip(name)?;
        self.bus.chip(id)?.as_any().downcast_ref::<T>()
    }

    pub fn chip_mut<T: Chip>(&mut self, name: &str) -> Option<&mut T> {
        let id = self.bus.find_chip(name)?;
        self.bus.chip_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Total CPU cycles since power-on.
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }
}

impl std::fmt::Debug for Computer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computer")
            .field("name", &self.name)
            .field("cpu", &self.cpu.registers())
            .field("cycles", &self.cpu.cycles())
            .field("chips", &self.bus.chips().map(|slot| slot.name()).collect::<Vec<_>>())
            .finish()
    }
}

fn find_storage(memory: &Memory, name: &str) -> Result<crate::memory::StorageId, ConfigError> {
    memory
        .find_storage(name)
        .ok_or_else(|| ConfigError::UnknownStorage(name.to_string()))
}

fn find_subset(memory: &Memory, name: &str) -> Result<SubsetId, ConfigError> {
    memory
        .find_subset(name)
        .ok_or_else(|| ConfigError::UnknownSubset(name.to_string()))
}

fn find_view(memory: &Memory, name: &str) -> Result<ViewId, ConfigError> {
    memory
        .find_view(name)
        .ok_or_else(|| ConfigError::UnknownView(name.to_string()))
}

fn build_bank(memory: &Memory, chip: &str, bank: &BankConfig) -> Result<BankSwitch, ConfigError> {
    if bank.configurations.is_empty() {
        return Err(ConfigError::EmptyBankTable(chip.to_string()));
    }
    let view = find_view(memory, &bank.view)?;
    let configurations = bank
        .configurations
        .iter()
        .map(|names| names.iter().map(|name| find_subset(memory, name)).collect())
        .collect::<Result<Vec<Vec<SubsetId>>, ConfigError>>()?;
    let switch = BankSwitch::new(view, configurations);
    switch.validate(memory)?;
    Ok(switch)
}

fn build_chip(
    memory: &Memory,
    config: &MachineConfig,
    name: &str,
    kind: &ChipKind,
) -> Result<Box<dyn Chip>, ConfigError> {
    let bank = |bank: &Option<BankConfig>| -> Result<Option<BankSwitch>, ConfigError> {
        bank.as_ref().map(|b| build_bank(memory, name, b)).transpose()
    };
    let standard = config.clock.standard;
    Ok(match kind {
        ChipKind::IoPort { bank: table } => Box::new(IoPort::new(bank(table)?)),
        ChipKind::Timer { line, bank: table } => {
            Box::new(TimerChip::new(*line, standard.cycles_per_tenth(), bank(table)?))
        }
        ChipKind::Raster { view, color_storage } => {
            let view = view.as_deref().map(|v| find_view(memory, v)).transpose()?;
            let color = color_storage
                .as_deref()
                .map(|s| find_storage(memory, s))
                .transpose()?;
            Box::new(RasterChip::new(standard, view, color))
        }
    })
}
