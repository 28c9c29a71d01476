//! 6510 on-chip I/O port.
//!
//! Two registers at offsets 0 and 1 (mapped at $00/$01 on a C64):
//!
//! - offset 0: data direction register, 1 = output;
//! - offset 1: data register.
//!
//! Input bits read the external lines, which are pulled up. Bits 0-2 of
//! the effective value (LORAM, HIRAM, CHAREN) select the CPU's bank
//! configuration:
//!
//! | Value | $A000-$BFFF | $D000-$DFFF | $E000-$FFFF |
//! |-------|-------------|-------------|-------------|
//! | 0, 4  | RAM         | RAM         | RAM         |
//! | 1     | RAM         | CHAR ROM    | RAM         |
//! | 2     | RAM         | CHAR ROM    | KERNAL      |
//! | 3     | BASIC       | CHAR ROM    | KERNAL      |
//! | 5     | RAM         | I/O         | RAM         |
//! | 6     | RAM         | I/O         | KERNAL      |
//! | 7     | BASIC       | I/O         | KERNAL      |

use std::any::Any;

use tracing::warn;

use super::{BankSwitch, Chip, ChipContext};

const DEFAULT_DDR: u8 = 0x2F;
const DEFAULT_DATA: u8 = 0x37;
/// Pull-ups on the banking lines and the cassette sense line.
const DEFAULT_EXTERNAL: u8 = 0x17;

/// The processor port.
#[derive(Debug, Clone)]
pub struct IoPort {
    ddr: u8,
    data: u8,
    external: u8,
    bank: Option<BankSwitch>,
    cycles: u64,
}

impl IoPort {
    pub fn new(bank: Option<BankSwitch>) -> Self {
        Self {
            ddr: DEFAULT_DDR,
            data: DEFAULT_DATA,
            external: DEFAULT_EXTERNAL,
            bank,
            cycles: 0,
        }
    }

    /// Output bits from the data register, input bits from the lines.
    pub fn effective(&self) -> u8 {
        (self.data & self.ddr) | (self.external & !self.ddr)
    }

    /// Bank configuration selector, 0-7.
    pub fn bank_config(&self) -> u8 {
        self.effective() & 0x07
    }

    pub fn ddr(&self) -> u8 {
        self.ddr
    }

    pub fn data(&self) -> u8 {
        self.data
    }

    /// Drives the external lines (cassette sense and friends).
    pub fn set_external(&mut self, value: u8, ctx: &mut ChipContext<'_>) {
        self.external = value;
        self.update_bank(ctx);
    }

    pub fn bank(&self) -> Option<&BankSwitch> {
        self.bank.as_ref()
    }

    fn update_bank(&mut self, ctx: &mut ChipContext<'_>) {
        let selector = self.bank_config();
        if let Some(bank) = self.bank.as_mut() {
            if let Err(err) = bank.apply(selector, ctx.memory) {
                warn!(%err, selector, "processor port bank switch rejected");
            }
        }
    }
}

impl Default for IoPort {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Chip for IoPort {
    fn simulate(&mut self, cycles: u32, _ctx: &mut ChipContext<'_>) {
        self.cycles += cycles as u64;
    }

    fn read(&mut self, offset: u16) -> u8 {
        self.peek(offset)
    }

    fn peek(&self, offset: u16) -> u8 {
        if offset & 1 == 0 {
            self.ddr
        } else {
            self.effective()
        }
    }

    fn write(&mut self, offset: u16, value: u8, ctx: &mut ChipContext<'_>) {
        if offset & 1 == 0 {
            self.ddr = value;
        } else {
            self.data = value;
        }
        self.update_bank(ctx);
    }

    fn reset(&mut self, ctx: &mut ChipContext<'_>) {
        self.ddr = DEFAULT_DDR;
        self.data = DEFAULT_DATA;
        if let Some(bank) = self.bank.as_mut() {
            bank.invalidate();
        }
        self.update_bank(ctx);
    }

    fn cycles(&self) -> u64 {
        self.cycles
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::memory::{Access, Memory, StorageKind, ViewId};

    #[test]
    fn test_default_configuration() {
        let port = IoPort::default();
        assert_eq!(port.ddr(), 0x2F);
        assert_eq!(port.data(), 0x37);
        assert_eq!(port.peek(1), 0x37);
        assert_eq!(port.bank_config(), 7);
    }

    #[test]
    fn test_input_bits_read_pull_ups() {
        let mut memory = Memory::new();
        let mut ctx = ChipContext::new(&mut memory, None);
        let mut port = IoPort::default();

        // All inputs: the pulled-up banking lines read high.
        port.write(0, 0x00, &mut ctx);
        port.write(1, 0x00, &mut ctx);
        assert_eq!(port.bank_config(), 7);

        port.write(0, 0xFF, &mut ctx);
        assert_eq!(port.peek(1), 0x00);
        assert_eq!(port.bank_config(), 0);
    }

    fn banked_port() -> (Memory, ViewId, IoPort) {
        let mut memory = Memory::new();
        let ram = memory.add_storage("ram", StorageKind::Ram, 0x100, 0xAA);
        let rom = memory.add_storage("rom", StorageKind::Rom, 0x100, 0xBB);
        let ram_page = memory
            .add_subset("ram", ram, 0, Address::new(0xA000), 0x100, Access::ReadWrite)
            .unwrap();
        let rom_page = memory
            .add_subset("rom", rom, 0, Address::new(0xA000), 0x100, Access::ReadOnly)
            .unwrap();
        let view = memory.add_view("cpu");
        // Odd selectors show ROM.
        let configurations = (0..8)
            .map(|i| if i & 1 == 1 { vec![rom_page] } else { vec![ram_page] })
            .collect();
        let port = IoPort::new(Some(BankSwitch::new(view, configurations)));
        (memory, view, port)
    }

    #[test]
    fn test_data_write_switches_banks() {
        let (mut memory, view, mut port) = banked_port();
        {
            let mut ctx = ChipContext::new(&mut memory, None);
            port.reset(&mut ctx);
        }
        assert_eq!(memory.read(Address::new(0xA000), view), 0xBB);

        {
            let mut ctx = ChipContext::new(&mut memory, None);
            port.write(1, 0x36, &mut ctx);
        }
        assert_eq!(memory.read(Address::new(0xA000), view), 0xAA);
    }
}
