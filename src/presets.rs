//! Ready-made machine descriptions.
//!
//! [`commodore64`] lays out the C64 address space:
//!
//! ```text
//! $0000-$0001  processor port (IoPort "port")
//! $0002-$9FFF  RAM
//! $A000-$BFFF  BASIC ROM or RAM
//! $C000-$CFFF  RAM
//! $D000-$DFFF  I/O, character ROM or RAM
//!              $D000 raster chip "vic", $D800 colour RAM,
//!              $DC00 timer chip "cia1" (IRQ), $DD00 timer chip "cia2" (NMI)
//! $E000-$FFFF  KERNAL ROM or RAM
//! ```
//!
//! The ROMs are empty until images are installed with
//! [`Computer::load_storage`](crate::Computer::load_storage). Writes to a
//! ROM land in the RAM underneath.
//!
//! The raster chip reads through its own 16K view, "video". Bits 0-1 of
//! cia2's port A select which quarter of RAM it sees (inverted: %11 is
//! $0000-$3FFF); in the first and third quarters the character ROM
//! replaces RAM at offset $1000.

use crate::clock::VideoStandard;
use crate::config::{
    BankConfig, ChipConfig, ChipKind, ClockConfig, MachineConfig, RegisterWindow, StorageConfig,
    SubsetConfig,
    ViewConfig,
};
use crate::cpu::IllegalOpcodePolicy;
use crate::interrupts::InterruptLine;
use crate::memory::{Access, StorageKind};

const IO: [&str; 4] = ["vic", "color_ram", "cia1", "cia2"];

fn storage(name: &str, kind: StorageKind, size: usize) -> StorageConfig {
    StorageConfig {
        name: name.to_string(),
        kind,
        size,
        fill: 0x00,
    }
}

fn subset(name: &str, storage: &str, offset: usize, start: u16, len: usize) -> SubsetConfig {
    SubsetConfig {
        name: name.to_string(),
        storage: storage.to_string(),
        offset,
        start,
        len,
        access: Access::ReadWrite,
        write_through: None,
    }
}

fn rom(name: &str, storage: &str, start: u16, len: usize, under: &str) -> SubsetConfig {
    SubsetConfig {
        access: Access::ReadOnly,
        write_through: Some(under.to_string()),
        ..subset(name, storage, 0, start, len)
    }
}

fn chip(name: &str, kind: ChipKind, start: u16, len: usize) -> ChipConfig {
    ChipConfig {
        name: name.to_string(),
        kind,
        registers: Some(RegisterWindow { start, len }),
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// The CPU's eight layouts, indexed by LORAM | HIRAM << 1 | CHAREN << 2.
fn cpu_banks() -> Vec<Vec<String>> {
    let with_io = |a000: &str, e000: &str| {
        let mut list = vec![a000];
        list.extend(IO);
        list.push(e000);
        names(&list)
    };
    vec![
        names(&["ram_a000", "ram_d000", "ram_e000"]),
        names(&["ram_a000", "chargen", "ram_e000"]),
        names(&["ram_a000", "chargen", "kernal"]),
        names(&["basic", "chargen", "kernal"]),
        names(&["ram_a000", "ram_d000", "ram_e000"]),
        with_io("ram_a000", "ram_e000"),
        with_io("ram_a000", "kernal"),
        with_io("basic", "kernal"),
    ]
}

/// The raster chip's four 16K windows, indexed by cia2 port A bits 0-1.
fn video_banks() -> Vec<Vec<String>> {
    vec![
        names(&["video3"]),
        names(&["video2_lo", "video2_char", "video2_hi"]),
        names(&["video1"]),
        names(&["video0_lo", "video0_char", "video0_hi"]),
    ]
}

/// A C64-style machine.
pub fn commodore64(standard: VideoStandard) -> MachineConfig {
    let mut subsets = vec![
        subset("ram_low", "ram", 0x0002, 0x0002, 0x9FFE),
        subset("ram_a000", "ram", 0xA000, 0xA000, 0x2000),
        rom("basic", "basic", 0xA000, 0x2000, "ram_a000"),
        subset("ram_c000", "ram", 0xC000, 0xC000, 0x1000),
        subset("ram_d000", "ram", 0xD000, 0xD000, 0x1000),
        rom("chargen", "chargen", 0xD000, 0x1000, "ram_d000"),
        subset("color_ram", "color", 0, 0xD800, 0x400),
        subset("ram_e000", "ram", 0xE000, 0xE000, 0x2000),
        rom("kernal", "kernal", 0xE000, 0x2000, "ram_e000"),
        subset("video1", "ram", 0x4000, 0x0000, 0x4000),
        subset("video3", "ram", 0xC000, 0x0000, 0x4000),
    ];
    for (bank, base) in [(0usize, 0x0000usize), (2, 0x8000)] {
        subsets.push(subset(&format!("video{bank}_lo"), "ram", base, 0x0000, 0x1000));
        subsets.push(SubsetConfig {
            access: Access::ReadOnly,
            ..subset(&format!("video{bank}_char"), "chargen", 0, 0x1000, 0x1000)
        });
        subsets.push(subset(&format!("video{bank}_hi"), "ram", base + 0x2000, 0x2000, 0x2000));
    }

    MachineConfig {
        name: format!("commodore64-{}", match standard {
            VideoStandard::Pal => "pal",
            VideoStandard::Ntsc => "ntsc",
        }),
        clock: ClockConfig {
            standard,
            ..ClockConfig::default()
        },
        open_bus: 0xFF,
        illegal_opcodes: IllegalOpcodePolicy::Emulate,
        storages: vec![
            storage("ram", StorageKind::Ram, 0x10000),
            storage("basic", StorageKind::Rom, 0x2000),
            storage("kernal", StorageKind::Rom, 0x2000),
            storage("chargen", StorageKind::Rom, 0x1000),
            storage("color", StorageKind::Ram, 0x400),
        ],
        subsets,
        chips: vec![
            chip(
                "port",
                ChipKind::IoPort {
                    bank: Some(BankConfig {
                        view: "cpu".to_string(),
                        configurations: cpu_banks(),
                    }),
                },
                0x0000,
                2,
            ),
            chip(
                "vic",
                ChipKind::Raster {
                    view: Some("video".to_string()),
                    color_storage: Some("color".to_string()),
                },
                0xD000,
                0x400,
            ),
            chip(
                "cia1",
                ChipKind::Timer {
                    line: InterruptLine::Irq,
                    bank: None,
                },
                0xDC00,
                0x100,
            ),
            chip(
                "cia2",
                ChipKind::Timer {
                    line: InterruptLine::Nmi,
                    bank: Some(BankConfig {
                        view: "video".to_string(),
                        configurations: video_banks(),
                    }),
                },
                0xDD00,
                0x100,
            ),
        ],
        views: vec![
            ViewConfig {
                name: "cpu".to_string(),
                map: names(&["port", "ram_low", "ram_c000"]),
            },
            ViewConfig {
                name: "video".to_string(),
                map: Vec::new(),
            },
        ],
        cpu_view: "cpu".to_string(),
    }
}

/// 64K of RAM and nothing else. Handy for running bare programs.
pub fn flat_ram() -> MachineConfig {
    MachineConfig {
        name: "flat".to_string(),
        clock: ClockConfig::default(),
        open_bus: 0xFF,
        illegal_opcodes: IllegalOpcodePolicy::Emulate,
        storages: vec![storage("ram", StorageKind::Ram, 0x10000)],
        subsets: vec![subset("ram", "ram", 0, 0x0000, 0x10000)],
        chips: Vec::new(),
        views: vec![ViewConfig {
            name: "cpu".to_string(),
            map: names(&["ram"]),
        }],
        cpu_view: "cpu".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_tables_are_complete() {
        assert_eq!(cpu_banks().len(), 8);
        assert_eq!(video_banks().len(), 4);
        assert_eq!(cpu_banks()[7], names(&["basic", "vic", "color_ram", "cia1", "cia2", "kernal"]));
    }

    #[test]
    fn test_commodore64_survives_json() {
        let config = commodore64(VideoStandard::Ntsc);
        let json = config.to_json().unwrap();
        assert_eq!(MachineConfig::from_json(&json).unwrap(), config);
        assert!(config.check_names().is_ok());
    }
}
