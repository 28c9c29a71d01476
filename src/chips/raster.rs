//! VIC-style raster chip.
//!
//! Frame-accurate rather than cycle-exact: the chip counts CPU cycles into
//! raster lines and renders each visible line when the beam leaves it. A
//! completed frame is handed to the subscriber as [`ChipOutput::Frame`].
//!
//! Video memory is fetched through the chip's own memory view (a 16K window
//! whose bank another chip selects) plus a separate colour storage, so the
//! chip can see character ROM where the CPU sees I/O, and vice versa.
//!
//! Registers of interest:
//!
//! - `$11`: control 1 (bit 7 raster compare bit 8 / raster bit 8, bit 5
//!   bitmap mode, bit 4 display enable);
//! - `$12`: raster compare (write) / raster line (read);
//! - `$18`: memory pointers;
//! - `$19`: interrupt flags, write 1 to clear;
//! - `$1A`: interrupt enable;
//! - `$20`, `$21`: border and background colour.

use std::any::Any;

use super::{Chip, ChipContext, ChipOutput};
use crate::address::Address;
use crate::clock::VideoStandard;
use crate::memory::{Memory, StorageId, ViewId};

/// Register count; the rest of each 64-byte block reads as $FF.
pub const REGISTER_COUNT: usize = 47;

const COLUMNS: usize = 40;
const ROWS: usize = 25;
const CHAR_HEIGHT: usize = 8;

pub const SCREEN_WIDTH: usize = COLUMNS * 8;
pub const SCREEN_HEIGHT: usize = ROWS * CHAR_HEIGHT;

/// First raster line of the display window.
const DISPLAY_START_LINE: u16 = 51;

const REG_CONTROL_1: usize = 0x11;
const REG_RASTER: usize = 0x12;
const REG_MEMORY: usize = 0x18;
const REG_IRQ_FLAGS: usize = 0x19;
const REG_IRQ_ENABLE: usize = 0x1A;
const REG_COLLISION_SS: usize = 0x1E;
const REG_COLLISION_SB: usize = 0x1F;
const REG_BORDER: usize = 0x20;
const REG_BACKGROUND: usize = 0x21;

const IRQ_RASTER: u8 = 0x01;

/// The raster chip.
#[derive(Debug, Clone)]
pub struct RasterChip {
    registers: [u8; REGISTER_COUNT],
    standard: VideoStandard,
    view: Option<ViewId>,
    color: Option<StorageId>,
    raster: u16,
    cycle_in_line: u32,
    framebuffer: Vec<u8>,
    frames: u64,
    cycles: u64,
}

impl RasterChip {
    pub fn new(standard: VideoStandard, view: Option<ViewId>, color: Option<StorageId>) -> Self {
        let mut chip = Self {
            registers: [0; REGISTER_COUNT],
            standard,
            view,
            color,
            raster: 0,
            cycle_in_line: 0,
            framebuffer: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
            frames: 0,
            cycles: 0,
        };
        chip.power_on_registers();
        chip
    }

    fn power_on_registers(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.registers[REG_CONTROL_1] = 0x1B;
        self.registers[0x16] = 0xC8;
        self.registers[REG_MEMORY] = 0x15;
        self.registers[REG_BORDER] = 0x0E;
        self.registers[REG_BACKGROUND] = 0x06;
    }

    pub fn raster(&self) -> u16 {
        self.raster
    }

    /// Frames completed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Palette indices of the last rendered lines, row-major 320x200.
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    pub fn border_color(&self) -> u8 {
        self.registers[REG_BORDER] & 0x0F
    }

    pub fn background_color(&self) -> u8 {
        self.registers[REG_BACKGROUND] & 0x0F
    }

    pub fn display_enabled(&self) -> bool {
        self.registers[REG_CONTROL_1] & 0x10 != 0
    }

    pub fn bitmap_mode(&self) -> bool {
        self.registers[REG_CONTROL_1] & 0x20 != 0
    }

    fn extended_modes(&self) -> bool {
        self.registers[REG_CONTROL_1] & 0x40 != 0 || self.registers[0x16] & 0x10 != 0
    }

    pub fn raster_compare(&self) -> u16 {
        let high = ((self.registers[REG_CONTROL_1] & 0x80) as u16) << 1;
        high | self.registers[REG_RASTER] as u16
    }

    /// Video matrix offset within the 16K window.
    pub fn screen_base(&self) -> u16 {
        (self.registers[REG_MEMORY] >> 4) as u16 * 0x0400
    }

    pub fn char_base(&self) -> u16 {
        ((self.registers[REG_MEMORY] >> 1) & 0x07) as u16 * 0x0800
    }

    pub fn bitmap_base(&self) -> u16 {
        (self.registers[REG_MEMORY] & 0x08) as u16 * 0x0400
    }

    fn fetch(memory: &Memory, view: ViewId, offset: u16) -> u8 {
        memory.read(Address::new(offset & 0x3FFF), view)
    }

    fn fetch_color(&self, memory: &Memory, cell: usize) -> u8 {
        self.color
            .and_then(|id| memory.storage(id).ok())
            .map_or(0x0E, |storage| storage.read(cell))
            & 0x0F
    }

    fn render_line(&mut self, line: u16, memory: &Memory) {
        if line < DISPLAY_START_LINE || line >= DISPLAY_START_LINE + SCREEN_HEIGHT as u16 {
            return;
        }
        let y = (line - DISPLAY_START_LINE) as usize;
        let background = self.background_color();

        let view = match self.view {
            Some(view) if self.display_enabled() && !self.extended_modes() => view,
            _ => {
                self.fill_row(y, background);
                return;
            }
        };

        let row = y / CHAR_HEIGHT;
        let line_in_cell = y % CHAR_HEIGHT;
        for column in 0..COLUMNS {
            let cell = row * COLUMNS + column;
            let matrix = Self::fetch(memory, view, self.screen_base() + cell as u16);
            let (pattern, foreground, cell_background) = if self.bitmap_mode() {
                let offset =
                    self.bitmap_base() as usize + row * COLUMNS * 8 + column * 8 + line_in_cell;
                let pattern = Self::fetch(memory, view, offset as u16);
                (pattern, matrix >> 4, matrix & 0x0F)
            } else {
                let offset = self.char_base() as usize + matrix as usize * 8 + line_in_cell;
                let pattern = Self::fetch(memory, view, offset as u16);
                (pattern, self.fetch_color(memory, cell), background)
            };

            let x = column * 8;
            let pixels = &mut self.framebuffer[y * SCREEN_WIDTH + x..y * SCREEN_WIDTH + x + 8];
            for (bit, pixel) in pixels.iter_mut().enumerate() {
                *pixel = if pattern & (0x80 >> bit) != 0 {
                    foreground
                } else {
                    cell_background
                };
            }
        }
    }

    fn fill_row(&mut self, y: usize, color: u8) {
        self.framebuffer[y * SCREEN_WIDTH..(y + 1) * SCREEN_WIDTH].fill(color);
    }

    fn check_raster_irq(&mut self) {
        if self.raster == self.raster_compare() {
            self.registers[REG_IRQ_FLAGS] |= IRQ_RASTER;
        }
    }

    fn read_register(&self, offset: u16) -> u8 {
        let index = (offset & 0x3F) as usize;
        match index {
            REG_CONTROL_1 => {
                let bit8 = if self.raster > 0xFF { 0x80 } else { 0 };
                (self.registers[REG_CONTROL_1] & 0x7F) | bit8
            }
            REG_RASTER => self.raster as u8,
            REG_IRQ_FLAGS => {
                let any = if self.irq() { 0x80 } else { 0 };
                self.registers[REG_IRQ_FLAGS] | 0x70 | any
            }
            n if n < REGISTER_COUNT => self.registers[n],
            _ => 0xFF,
        }
    }
}

impl Chip for RasterChip {
    fn simulate(&mut self, cycles: u32, ctx: &mut ChipContext<'_>) {
        self.cycles += cycles as u64;
        self.cycle_in_line += cycles;
        let per_line = self.standard.cycles_per_line() as u32;
        while self.cycle_in_line >= per_line {
            self.cycle_in_line -= per_line;
            self.render_line(self.raster, ctx.memory);
            self.raster += 1;
            if self.raster >= self.standard.lines() {
                self.raster = 0;
                self.frames += 1;
                ctx.emit(&ChipOutput::Frame {
                    width: SCREEN_WIDTH,
                    height: SCREEN_HEIGHT,
                    pixels: &self.framebuffer,
                });
            }
            self.check_raster_irq();
        }
    }

    fn read(&mut self, offset: u16) -> u8 {
        let value = self.read_register(offset);
        let index = (offset & 0x3F) as usize;
        if index == REG_COLLISION_SS || index == REG_COLLISION_SB {
            self.registers[index] = 0;
        }
        value
    }

    fn peek(&self, offset: u16) -> u8 {
        self.read_register(offset)
    }

    fn write(&mut self, offset: u16, value: u8, _ctx: &mut ChipContext<'_>) {
        let index = (offset & 0x3F) as usize;
        match index {
            REG_COLLISION_SS | REG_COLLISION_SB => {}
            REG_IRQ_FLAGS => self.registers[REG_IRQ_FLAGS] &= !(value & 0x0F),
            REG_IRQ_ENABLE => self.registers[REG_IRQ_ENABLE] = value & 0x0F,
            n if n < REGISTER_COUNT => {
                self.registers[n] = value;
                if n == REG_CONTROL_1 || n == REG_RASTER {
                    self.check_raster_irq();
                }
            }
            _ => {}
        }
    }

    fn reset(&mut self, _ctx: &mut ChipContext<'_>) {
        self.power_on_registers();
        self.raster = 0;
        self.cycle_in_line = 0;
    }

    fn irq(&self) -> bool {
        self.registers[REG_IRQ_FLAGS] & self.registers[REG_IRQ_ENABLE] & 0x0F != 0
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
    use crate::chips::OutputSink;
    use crate::memory::{Access, StorageKind};

    fn setup_video() -> (Memory, ViewId, StorageId) {
        let mut memory = Memory::new();
        let ram = memory.add_storage("ram", StorageKind::Ram, 0x4000, 0x00);
        let color = memory.add_storage("color", StorageKind::Ram, 0x0400, 0x01);
        let window = memory
            .add_subset("vic", ram, 0, Address::new(0x0000), 0x4000, Access::ReadWrite)
            .unwrap();
        let view = memory.add_view("vic");
        memory.map(window, view).unwrap();
        (memory, view, color)
    }

    #[test]
    fn test_power_on_defaults() {
        let chip = RasterChip::new(VideoStandard::Pal, None, None);
        assert_eq!(chip.border_color(), 0x0E);
        assert_eq!(chip.background_color(), 0x06);
        assert!(chip.display_enabled());
        assert_eq!(chip.screen_base(), 0x0400);
        assert_eq!(chip.char_base(), 0x1000);
    }

    #[test]
    fn test_raster_counts_lines() {
        let (mut memory, _, _) = setup_video();
        let mut chip = RasterChip::new(VideoStandard::Pal, None, None);
        let mut ctx = ChipContext::new(&mut memory, None);
        chip.simulate(63 * 300, &mut ctx);
        assert_eq!(chip.raster(), 300);
        assert_eq!(chip.peek(0x12), 300u16 as u8);
        assert_eq!(chip.peek(0x11) & 0x80, 0x80);
    }

    #[test]
    fn test_raster_interrupt_and_acknowledge() {
        let (mut memory, _, _) = setup_video();
        let mut chip = RasterChip::new(VideoStandard::Pal, None, None);
        let mut ctx = ChipContext::new(&mut memory, None);
        chip.write(0x12, 10, &mut ctx);
        chip.write(0x11, 0x1B, &mut ctx);
        chip.write(0x1A, 0x01, &mut ctx);

        chip.simulate(63 * 9, &mut ctx);
        assert!(!chip.irq());
        chip.simulate(63, &mut ctx);
        assert!(chip.irq());
        assert_eq!(chip.peek(0x19), 0xF1);

        chip.write(0x19, 0x01, &mut ctx);
        assert!(!chip.irq());
        assert_eq!(chip.peek(0x19), 0x70);
    }

    #[test]
    fn test_registers_mirror_every_64_bytes() {
        let (mut memory, _, _) = setup_video();
        let mut chip = RasterChip::new(VideoStandard::Pal, None, None);
        let mut ctx = ChipContext::new(&mut memory, None);
        chip.write(0x60, 0x05, &mut ctx);
        assert_eq!(chip.peek(0x20), 0x05);
        assert_eq!(chip.peek(0x2F), 0xFF);
    }

    #[test]
    fn test_text_mode_renders_through_view() {
        let (mut memory, view, color) = setup_video();
        let ram = memory.find_storage("ram").unwrap();
        // Character 1, top line: leftmost pixel.
        memory.storage_mut(ram).unwrap().load(0x1008, &[0x80]).unwrap();
        memory.storage_mut(ram).unwrap().load(0x0400, &[0x01]).unwrap();

        let mut chip = RasterChip::new(VideoStandard::Pal, Some(view), Some(color));
        let mut ctx = ChipContext::new(&mut memory, None);
        chip.simulate(63 * 52, &mut ctx);

        let fb = chip.framebuffer();
        assert_eq!(fb[0], 0x01);
        assert_eq!(fb[1], 0x06);
    }

    #[test]
    fn test_bitmap_mode() {
        let (mut memory, view, color) = setup_video();
        let ram = memory.find_storage("ram").unwrap();
        memory.storage_mut(ram).unwrap().load(0x2000, &[0xF0]).unwrap();
        memory.storage_mut(ram).unwrap().load(0x0400, &[0x2B]).unwrap();

        let mut chip = RasterChip::new(VideoStandard::Pal, Some(view), Some(color));
        let mut ctx = ChipContext::new(&mut memory, None);
        chip.write(0x11, 0x3B, &mut ctx);
        chip.write(0x18, 0x18, &mut ctx);
        chip.simulate(63 * 52, &mut ctx);

        let fb = chip.framebuffer();
        assert_eq!(&fb[0..8], &[2, 2, 2, 2, 0xB, 0xB, 0xB, 0xB]);
    }

    #[test]
    fn test_frame_emitted_at_end_of_frame() {
        let (mut memory, _, _) = setup_video();
        let frames = std::rc::Rc::new(std::cell::Cell::new(0));
        let seen = frames.clone();
        let mut sink: OutputSink = Box::new(move |output| {
            let ChipOutput::Frame { width, height, pixels } = output;
            assert_eq!(pixels.len(), width * height);
            seen.set(seen.get() + 1);
        });
        let mut chip = RasterChip::new(VideoStandard::Ntsc, None, None);
        let mut ctx = ChipContext::new(&mut memory, Some(&mut sink));
        chip.simulate(VideoStandard::Ntsc.cycles_per_frame() - 1, &mut ctx);
        assert_eq!(frames.get(), 0);
        chip.simulate(1, &mut ctx);
        assert_eq!(frames.get(), 1);
        assert_eq!(chip.frames(), 1);
        assert_eq!(chip.raster(), 0);
    }
}
