//! The machine bus: the banked memory model plus the chips whose register
//! windows live in it.
//!
//! CPU accesses resolve through the memory's active view. Storage-backed
//! addresses go to [`Memory`]; register windows go to the owning chip with
//! an offset relative to the window start. The interrupt lines are the OR
//! of every chip's outputs.

use tracing::trace;

use crate::address::Address;
use crate::chips::{Chip, ChipContext, ChipId, OutputSink};
use crate::memory::{Memory, MemoryBus, Target};

/// A registered chip.
pub struct ChipSlot {
    id: ChipId,
    name: String,
    chip: Box<dyn Chip>,
    sink: Option<OutputSink>,
}

impl ChipSlot {
    pub fn id(&self) -> ChipId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chip(&self) -> &dyn Chip {
        self.chip.as_ref()
    }
}

/// Memory plus chips, as seen by the CPU.
pub struct Bus {
    memory: Memory,
    chips: Vec<ChipSlot>,
}

impl Bus {
    pub fn new(memory: Memory) -> Self {
        Self {
            memory,
            chips: Vec::new(),
        }
    }

    /// Id the next [`Bus::add_chip`] will hand out. Register windows are
    /// created against it before the chip itself exists.
    pub fn next_chip_id(&self) -> ChipId {
        ChipId(self.chips.len())
    }

    /// Registers a chip. Chips are simulated in registration order.
    pub fn add_chip(&mut self, name: &str, chip: Box<dyn Chip>) -> ChipId {
        let id = self.next_chip_id();
        self.chips.push(ChipSlot {
            id,
            name: name.to_string(),
            chip,
            sink: None,
        });
        id
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn chips(&self) -> impl Iterator<Item = &ChipSlot> {
        self.chips.iter()
    }

    pub fn find_chip(&self, name: &str) -> Option<ChipId> {
        self.chips.iter().find(|slot| slot.name == name).map(|slot| slot.id)
    }

    pub fn chip(&self, id: ChipId) -> Option<&dyn Chip> {
        self.chips.get(id.0).map(|slot| slot.chip.as_ref())
    }

    pub fn chip_mut(&mut self, id: ChipId) -> Option<&mut dyn Chip> {
        self.chips.get_mut(id.0).map(|slot| slot.chip.as_mut())
    }

    /// Runs `f` on a chip with a context over this bus's memory.
    pub fn with_chip<R>(
        &mut self,
        id: ChipId,
        f: impl FnOnce(&mut dyn Chip, &mut ChipContext<'_>) -> R,
    ) -> Option<R> {
        let slot = self.chips.get_mut(id.0)?;
        let mut ctx = ChipContext::new(&mut self.memory, slot.sink.as_mut());
        Some(f(slot.chip.as_mut(), &mut ctx))
    }

    /// Installs the output sink of a chip, replacing any previous one.
    pub fn set_sink(&mut self, id: ChipId, sink: OutputSink) -> bool {
        match self.chips.get_mut(id.0) {
            Some(slot) => {
                slot.sink = Some(sink);
                true
            }
            None => false,
        }
    }

    /// Advances every chip by `cycles`, in registration order.
    pub fn simulate_chips(&mut self, cycles: u32) {
        for slot in self.chips.iter_mut() {
            let mut ctx = ChipContext::new(&mut self.memory, slot.sink.as_mut());
            slot.chip.simulate(cycles, &mut ctx);
        }
    }

    pub fn reset_chips(&mut self) {
        for slot in self.chips.iter_mut() {
            let mut ctx = ChipContext::new(&mut self.memory, slot.sink.as_mut());
            slot.chip.reset(&mut ctx);
        }
    }

    fn resolve(&self, addr: u16, write: bool) -> Target {
        let Some(view) = self.memory.active_view() else {
            return Target::OpenBus;
        };
        if write {
            self.memory.resolve_write(Address::new(addr), view)
        } else {
            self.memory.resolve(Address::new(addr), view)
        }
    }

    fn read_target(&self, addr: u16, target: Target) -> u8 {
        match target {
            Target::Storage {
                storage, offset, ..
            } => self
                .memory
                .storage(storage)
                .map_or(self.memory.open_bus(), |s| s.read(offset)),
            Target::Registers { .. } | Target::OpenBus => {
                trace!(address = %Address::new(addr), "unmapped read");
                self.memory.open_bus()
            }
        }
    }
}

impl MemoryBus for Bus {
    fn read(&mut self, addr: u16) -> u8 {
        match self.resolve(addr, false) {
            Target::Registers { chip, offset } => match self.chips.get_mut(chip.0) {
                Some(slot) => slot.chip.read(offset),
                None => self.memory.open_bus(),
            },
            target => self.read_target(addr, target),
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        match self.resolve(addr, false) {
            Target::Registers { chip, offset } => self
                .chips
                .get(chip.0)
                .map_or(self.memory.open_bus(), |slot| slot.chip.peek(offset)),
            target => self.read_target(addr, target),
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        let Some(view) = self.memory.active_view() else {
            return;
        };
        match self.resolve(addr, true) {
            Target::Registers { chip, offset } => {
                if let Some(slot) = self.chips.get_mut(chip.0) {
                    let mut ctx = ChipContext::new(&mut self.memory, slot.sink.as_mut());
                    slot.chip.write(offset, value, &mut ctx);
                }
            }
            _ => self.memory.write(Address::new(addr), value, view),
        }
    }

    fn irq_active(&self) -> bool {
        self.chips.iter().any(|slot| slot.chip.irq())
    }

    fn nmi_active(&self) -> bool {
        self.chips.iter().any(|slot| slot.chip.nmi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chips::TimerChip;
    use crate::interrupts::InterruptLine;
    use crate::memory::{Access, StorageKind};

    fn setup_bus() -> Bus {
        let mut memory = Memory::new();
        let ram = memory.add_storage("ram", StorageKind::Ram, 0x10000, 0x00);
        let low = memory
            .add_subset("low", ram, 0, Address::new(0x0000), 0xDC00, Access::ReadWrite)
            .unwrap();
        let view = memory.add_view("cpu");
        memory.map(low, view).unwrap();

        let mut bus = Bus::new(memory);
        let id = bus.next_chip_id();
        let window = bus
            .memory_mut()
            .add_register_window("cia", id, Address::new(0xDC00), 0x100)
            .unwrap();
        bus.memory_mut().map(window, view).unwrap();
        bus.add_chip("cia", Box::new(TimerChip::new(InterruptLine::Irq, 1000, None)));
        bus
    }

    #[test]
    fn test_storage_and_register_routing() {
        let mut bus = setup_bus();
        bus.write(0x1000, 0x42);
        assert_eq!(bus.read(0x1000), 0x42);

        // DDR A, mirrored every 16 bytes.
        bus.write(0xDC02, 0xFF);
        assert_eq!(bus.read(0xDC12), 0xFF);
        assert_eq!(bus.peek(0xDC02), 0xFF);

        // Nothing mapped above the window.
        assert_eq!(bus.read(0xE000), 0xFF);
    }

    #[test]
    fn test_peek_has_no_side_effects() {
        let mut bus = setup_bus();
        bus.write(0xDC0D, 0x81);
        bus.write(0xDC04, 0x00);
        bus.write(0xDC05, 0x00);
        bus.write(0xDC0E, 0x01);
        bus.simulate_chips(1);
        assert!(bus.irq_active());
        assert_eq!(bus.peek(0xDC0D), 0x81);
        assert!(bus.irq_active());
        assert_eq!(bus.read(0xDC0D), 0x81);
        assert!(!bus.irq_active());
    }
}
