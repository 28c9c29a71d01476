//! Fuzz target for CPU step execution.
//!
//! Arbitrary registers and memory contents, then a handful of instructions
//! against flat memory with randomly driven interrupt lines.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mos_machine::{Cpu, FlatMemory, IllegalOpcodePolicy, MemoryBus};

#[derive(Debug, Arbitrary)]
struct FuzzCpuState {
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    status: u8,
    halt_on_illegal: bool,
}

#[derive(Debug, Arbitrary)]
struct FuzzMemory {
    /// Code at $8000
    program: [u8; 16],
    zero_page: [u8; 256],
    stack_page: [u8; 256],
    /// Absolute operands land here often enough at $4000
    main_memory: [u8; 256],
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    cpu_state: FuzzCpuState,
    memory: FuzzMemory,
    irq: bool,
    nmi: bool,
}

fuzz_target!(|input: FuzzInput| {
    let mut memory = FlatMemory::new();
    // NMI $9000, RESET $8000, IRQ $9100
    memory.load(0xFFFA, &[0x00, 0x90, 0x00, 0x80, 0x00, 0x91]);
    memory.load(0x8000, &input.memory.program);
    memory.load(0x0000, &input.memory.zero_page);
    memory.load(0x0100, &input.memory.stack_page);
    memory.load(0x4000, &input.memory.main_memory);
    memory.set_irq_line(input.irq);
    memory.set_nmi_line(input.nmi);

    let policy = if input.cpu_state.halt_on_illegal {
        IllegalOpcodePolicy::Halt
    } else {
        IllegalOpcodePolicy::Emulate
    };
    let mut cpu = Cpu::power_on(&mut memory).with_policy(policy);
    cpu.set_a(input.cpu_state.a);
    cpu.set_x(input.cpu_state.x);
    cpu.set_y(input.cpu_state.y);
    cpu.set_sp(input.cpu_state.sp);
    cpu.set_status(input.cpu_state.status);

    let mut total = 0u64;
    for _ in 0..8 {
        match cpu.step(&mut memory) {
            Ok(cycles) => {
                // Longest instruction plus an interrupt entry
                assert!(cycles <= 8 + 7);
                total += cycles as u64;
            }
            Err(_) => {
                assert!(cpu.is_halted());
                break;
            }
        }
    }

    assert_eq!(cpu.cycles(), total);
    assert_eq!(cpu.status() & 0x20, 0x20);
});
