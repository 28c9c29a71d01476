//! MemoryBus implementations: the flat test memory and the machine bus.

use mos_machine::address::Address;
use mos_machine::interrupts::InterruptLine;
use mos_machine::memory::{Access, StorageKind};
use mos_machine::{Bus, FlatMemory, Memory, MemoryBus, TimerChip};

// ========== FlatMemory ==========

#[test]
fn test_flat_memory_starts_zeroed() {
    let memory = FlatMemory::new();

    for addr in [0x0000, 0x1234, 0x8000, 0xFFFF] {
        assert_eq!(memory.peek(addr), 0x00);
    }
}

#[test]
fn test_flat_memory_read_matches_peek() {
    let mut memory = FlatMemory::new();

    for (addr, value) in [(0x0000, 0x01), (0x00FF, 0xFF), (0x0100, 0x7F), (0xFFFF, 0x80)] {
        memory.write(addr, value);
        assert_eq!(memory.read(addr), value);
        assert_eq!(memory.peek(addr), value);
    }
}

#[test]
fn test_flat_memory_load_wraps() {
    let mut memory = FlatMemory::new();

    memory.load(0xFFFE, &[0x11, 0x22, 0x33]);

    assert_eq!(memory.peek(0xFFFE), 0x11);
    assert_eq!(memory.peek(0xFFFF), 0x22);
    assert_eq!(memory.peek(0x0000), 0x33);
}

#[test]
fn test_flat_memory_lines() {
    let mut memory = FlatMemory::new();
    assert!(!memory.irq_active());
    assert!(!memory.nmi_active());

    memory.set_irq_line(true);
    memory.set_nmi_line(true);

    assert!(memory.irq_active());
    assert!(memory.nmi_active());
}

// ========== Bus ==========

/// RAM below $DD00, an NMI timer chip at $DD00.
fn nmi_bus() -> Bus {
    let mut memory = Memory::new();
    let ram = memory.add_storage("ram", StorageKind::Ram, 0xDD00, 0x00);
    let low = memory
        .add_subset("ram", ram, 0, Address::new(0x0000), 0xDD00, Access::ReadWrite)
        .unwrap();
    let view = memory.add_view("cpu");
    memory.map(low, view).unwrap();

    let mut bus = Bus::new(memory);
    let id = bus.next_chip_id();
    let window = bus
        .memory_mut()
        .add_register_window("cia2", id, Address::new(0xDD00), 0x100)
        .unwrap();
    bus.memory_mut().map(window, view).unwrap();
    bus.add_chip("cia2", Box::new(TimerChip::new(InterruptLine::Nmi, 1000, None)));
    bus
}

#[test]
fn test_bus_chip_lookup() {
    let bus = nmi_bus();

    let id = bus.find_chip("cia2").unwrap();
    assert!(bus.chip(id).is_some());
    assert!(bus.find_chip("cia1").is_none());
    assert_eq!(bus.chips().map(|slot| slot.name()).collect::<Vec<_>>(), vec!["cia2"]);
}

#[test]
fn test_bus_nmi_line_follows_chip() {
    let mut bus = nmi_bus();
    bus.write(0xDD0D, 0x81);
    bus.write(0xDD04, 0x02);
    bus.write(0xDD05, 0x00);
    bus.write(0xDD0E, 0x01);

    bus.simulate_chips(10);

    assert!(bus.nmi_active());
    assert!(!bus.irq_active());

    bus.reset_chips();
    assert!(!bus.nmi_active());
}

#[test]
fn test_bus_without_active_view_is_open() {
    let mut bus = Bus::new(Memory::new());

    bus.write(0x1000, 0x42);

    assert_eq!(bus.read(0x1000), 0xFF);
    assert_eq!(bus.peek(0x1000), 0xFF);
}
