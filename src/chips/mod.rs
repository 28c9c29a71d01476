//! Clock-driven peripheral chips.
//!
//! A chip owns a register file that is placed in the address space as a
//! register window (see [`Memory::add_register_window`]). The machine bus
//! routes CPU accesses in that window to [`Chip::read`] and [`Chip::write`]
//! with offsets relative to the window start.
//!
//! # Interrupt model
//!
//! Chips drive the CPU's lines through [`Chip::irq`] and [`Chip::nmi`]. Both
//! are levels: the IRQ line is the OR of every chip, and stays asserted
//! until the handler acknowledges each source through its registers. The
//! CPU latches the rising edge of the NMI line.
//!
//! # Bank switching
//!
//! A chip whose registers select memory banks holds a [`BankSwitch`] and
//! applies it from its write handler, synchronously, through the
//! [`ChipContext`]. The CPU's next access already sees the new layout.
//!
//! [`Memory::add_register_window`]: crate::memory::Memory::add_register_window

mod io_port;
mod raster;
mod timer;

pub use io_port::IoPort;
pub use raster::{RasterChip, SCREEN_HEIGHT, SCREEN_WIDTH};
pub use timer::{Timer, TimerChip, TodClock};

use std::any::Any;
use std::fmt;

use tracing::trace;

use crate::memory::{Memory, MemoryError, SubsetId, ViewId};

/// Handle to a chip inside a machine bus. Ids follow registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChipId(pub(crate) usize);

impl ChipId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chip#{}", self.0)
    }
}

/// Output a chip hands to its presentation collaborator. Borrowed data is
/// only valid for the duration of the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipOutput<'a> {
    /// A completed frame of palette indices, row-major.
    Frame {
        width: usize,
        height: usize,
        pixels: &'a [u8],
    },
}

/// Callback receiving a chip's output.
pub type OutputSink = Box<dyn FnMut(&ChipOutput<'_>)>;

/// What a chip may touch while it runs: the memory model (to read through
/// its own view or to switch banks) and its output sink.
pub struct ChipContext<'a> {
    pub memory: &'a mut Memory,
    sink: Option<&'a mut OutputSink>,
}

impl<'a> ChipContext<'a> {
    pub fn new(memory: &'a mut Memory, sink: Option<&'a mut OutputSink>) -> Self {
        Self { memory, sink }
    }

    /// Hands `output` to the subscriber, if any. Nothing is retained.
    pub fn emit(&mut self, output: &ChipOutput<'_>) {
        if let Some(sink) = self.sink.as_mut() {
            sink(output);
        }
    }

    pub fn has_subscriber(&self) -> bool {
        self.sink.is_some()
    }
}

/// A peripheral stepped alongside the CPU.
pub trait Chip: Any {
    /// Advances the chip by `cycles` CPU cycles.
    fn simulate(&mut self, cycles: u32, ctx: &mut ChipContext<'_>);

    /// CPU read of register `offset`. May have side effects.
    fn read(&mut self, offset: u16) -> u8;

    /// Side-effect-free read of register `offset`.
    fn peek(&self, offset: u16) -> u8;

    fn write(&mut self, offset: u16, value: u8, ctx: &mut ChipContext<'_>);

    /// Returns the chip to its power-on register state and re-applies any
    /// bank selection that state implies.
    fn reset(&mut self, ctx: &mut ChipContext<'_>);

    /// Level this chip drives onto the IRQ line.
    fn irq(&self) -> bool {
        false
    }

    /// Level this chip drives onto the NMI line.
    fn nmi(&self) -> bool {
        false
    }

    /// Cycles simulated since construction.
    fn cycles(&self) -> u64;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A table of layouts for one view, selected by a register value.
///
/// Applying selector `s` unmaps every managed subset and maps
/// `configurations[s % len]` in one atomic remap.
#[derive(Debug, Clone)]
pub struct BankSwitch {
    view: ViewId,
    managed: Vec<SubsetId>,
    configurations: Vec<Vec<SubsetId>>,
    current: Option<usize>,
}

impl BankSwitch {
    pub fn new(view: ViewId, configurations: Vec<Vec<SubsetId>>) -> Self {
        let mut managed: Vec<SubsetId> = configurations.iter().flatten().copied().collect();
        managed.sort();
        managed.dedup();
        Self {
            view,
            managed,
            configurations,
            current: None,
        }
    }

    pub fn view(&self) -> ViewId {
        self.view
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Index of the configuration last applied.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Checks every configuration against the view's other mappings.
    pub fn validate(&self, memory: &Memory) -> Result<(), MemoryError> {
        for configuration in &self.configurations {
            memory.check_remap(self.view, &self.managed, configuration)?;
        }
        Ok(())
    }

    /// Switches the view to the configuration for `selector`. Re-selecting
    /// the current configuration touches nothing.
    pub fn apply(&mut self, selector: u8, memory: &mut Memory) -> Result<(), MemoryError> {
        if self.configurations.is_empty() {
            return Ok(());
        }
        let index = selector as usize % self.configurations.len();
        if self.current == Some(index) {
            return Ok(());
        }
        memory.remap(self.view, &self.managed, &self.configurations[index])?;
        trace!(view = self.view.0, configuration = index, "bank switched");
        self.current = Some(index);
        Ok(())
    }

    /// Forgets the applied configuration so the next `apply` remaps.
    pub fn invalidate(&mut self) {
        self.current = None;
    }
}
