//! CIA-style timer chip (MOS 6526).
//!
//! Sixteen registers, mirrored across the chip's window:
//!
//! | Offset | Read                  | Write                     |
//! |--------|-----------------------|---------------------------|
//! | 0, 1   | port A / B            | port A / B data           |
//! | 2, 3   | DDR A / B             | DDR A / B                 |
//! | 4, 5   | timer A counter lo/hi | timer A latch lo/hi       |
//! | 6, 7   | timer B counter lo/hi | timer B latch lo/hi       |
//! | 8-B    | TOD 10ths, s, m, h    | TOD or alarm (CRB bit 7)  |
//! | C      | serial data           | serial data               |
//! | D      | ICR flags, clears     | ICR mask                  |
//! | E, F   | CRA / CRB             | CRA / CRB                 |
//!
//! A running timer counts down once per cycle. On underflow it reloads from
//! its latch, raises its ICR flag and stops if in one-shot mode. Timer B can
//! count timer A underflows instead of cycles (CRB bits 5-6 = `1x`).
//!
//! The CNT pin is not connected: it idles high and never pulses. A timer set
//! to count CNT pulses (CRA bit 5, CRB bits 5-6 = `01`) therefore holds its
//! value, and CRB `11` (A underflows while CNT is high) counts every timer A
//! underflow.
//!
//! The interrupt output is wired to IRQ or NMI (CIA1 vs CIA2 on a C64).
//! Port A bits 0-1 can drive a [`BankSwitch`]; the C64 uses that to select
//! the video chip's 16K bank.

use std::any::Any;

use tracing::{trace, warn};

use super::{BankSwitch, Chip, ChipContext};
use crate::interrupts::InterruptLine;
use crate::numeric::{self, Format};

const ICR_TIMER_A: u8 = 0x01;
const ICR_TIMER_B: u8 = 0x02;
const ICR_ALARM: u8 = 0x04;

const CR_START: u8 = 0x01;
const CR_ONE_SHOT: u8 = 0x08;
const CR_FORCE_LOAD: u8 = 0x10;
const CRA_COUNT_CNT: u8 = 0x20;
const CRB_INPUT: u8 = 0x60;
const CRB_COUNT_CNT: u8 = 0x20;
const CRB_COUNT_A: u8 = 0x40;
const CRB_ALARM: u8 = 0x80;

/// One 16-bit countdown timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub counter: u16,
    pub latch: u16,
    pub running: bool,
    pub one_shot: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            counter: 0xFFFF,
            latch: 0xFFFF,
            running: false,
            one_shot: false,
        }
    }

    /// Counts one pulse. Returns `true` on underflow.
    pub fn clock(&mut self) -> bool {
        if !self.running {
            return false;
        }
        if self.counter == 0 {
            self.counter = self.latch;
            if self.one_shot {
                self.running = false;
            }
            true
        } else {
            self.counter -= 1;
            false
        }
    }

    fn write_latch_low(&mut self, value: u8) {
        self.latch = (self.latch & 0xFF00) | value as u16;
    }

    /// A stopped timer also loads its counter.
    fn write_latch_high(&mut self, value: u8) {
        self.latch = (self.latch & 0x00FF) | ((value as u16) << 8);
        if !self.running {
            self.counter = self.latch;
        }
    }

    fn control(&mut self, value: u8) {
        self.running = value & CR_START != 0;
        self.one_shot = value & CR_ONE_SHOT != 0;
        if value & CR_FORCE_LOAD != 0 {
            self.counter = self.latch;
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Time-of-day clock in packed decimal: tenths, seconds, minutes and
/// hours 1-12 with bit 7 as PM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodClock {
    pub time: [u8; 4],
    pub alarm: [u8; 4],
    /// Stopped by a write to hours until tenths are written.
    pub stopped: bool,
    /// Frozen copy shown while a read sequence is in progress.
    latch: Option<[u8; 4]>,
    cycles_per_tenth: u32,
    elapsed: u32,
}

const TENTHS: usize = 0;
const SECONDS: usize = 1;
const MINUTES: usize = 2;
const HOURS: usize = 3;

fn bcd_increment(value: u8) -> u8 {
    numeric::add_with_carry(value, 1, false, Format::PackedDecimal).value
}

impl TodClock {
    pub fn new(cycles_per_tenth: u32) -> Self {
        Self {
            time: [0x00, 0x00, 0x00, 0x01],
            alarm: [0x00; 4],
            stopped: false,
            latch: None,
            cycles_per_tenth: cycles_per_tenth.max(1),
            elapsed: 0,
        }
    }

    /// Advances by `cycles`. Returns `true` if the alarm time was reached.
    fn advance(&mut self, cycles: u32) -> bool {
        if self.stopped {
            return false;
        }
        self.elapsed += cycles;
        let mut alarm = false;
        while self.elapsed >= self.cycles_per_tenth {
            self.elapsed -= self.cycles_per_tenth;
            self.tick();
            alarm |= self.time == self.alarm;
        }
        alarm
    }

    /// One tenth of a second.
    fn tick(&mut self) {
        if self.time[TENTHS] < 0x09 {
            self.time[TENTHS] += 1;
            return;
        }
        self.time[TENTHS] = 0;
        if self.time[SECONDS] < 0x59 {
            self.time[SECONDS] = bcd_increment(self.time[SECONDS]);
            return;
        }
        self.time[SECONDS] = 0;
        if self.time[MINUTES] < 0x59 {
            self.time[MINUTES] = bcd_increment(self.time[MINUTES]);
            return;
        }
        self.time[MINUTES] = 0;

        let pm = self.time[HOURS] & 0x80;
        let hours = self.time[HOURS] & 0x1F;
        self.time[HOURS] = match hours {
            0x11 => 0x12 | (pm ^ 0x80),
            0x12 => 0x01 | pm,
            h => bcd_increment(h) | pm,
        };
    }

    fn shown(&self, index: usize) -> u8 {
        self.latch.map_or(self.time[index], |latched| latched[index])
    }
}

/// Port with a data direction register. Input bits read the external lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Port {
    pub data: u8,
    pub ddr: u8,
    pub external: u8,
}

impl Port {
    fn new() -> Self {
        Self {
            data: 0,
            ddr: 0,
            external: 0xFF,
        }
    }

    pub fn read(&self) -> u8 {
        (self.data & self.ddr) | (self.external & !self.ddr)
    }
}

/// The timer chip.
#[derive(Debug, Clone)]
pub struct TimerChip {
    line: InterruptLine,
    pub port_a: Port,
    pub port_b: Port,
    pub timer_a: Timer,
    pub timer_b: Timer,
    pub tod: TodClock,
    sdr: u8,
    icr_flags: u8,
    icr_mask: u8,
    interrupt_pending: bool,
    cra: u8,
    crb: u8,
    bank: Option<BankSwitch>,
    cycles: u64,
}

impl TimerChip {
    /// `cycles_per_tenth` drives the time-of-day clock.
    pub fn new(line: InterruptLine, cycles_per_tenth: u32, bank: Option<BankSwitch>) -> Self {
        Self {
            line,
            port_a: Port::new(),
            port_b: Port::new(),
            timer_a: Timer::new(),
            timer_b: Timer::new(),
            tod: TodClock::new(cycles_per_tenth),
            sdr: 0,
            icr_flags: 0,
            icr_mask: 0,
            interrupt_pending: false,
            cra: 0,
            crb: 0,
            bank,
            cycles: 0,
        }
    }

    pub fn line(&self) -> InterruptLine {
        self.line
    }

    pub fn interrupt_flags(&self) -> u8 {
        self.icr_flags
    }

    pub fn interrupt_mask(&self) -> u8 {
        self.icr_mask
    }

    pub fn interrupt_pending(&self) -> bool {
        self.interrupt_pending
    }

    pub fn cra(&self) -> u8 {
        self.cra
    }

    pub fn crb(&self) -> u8 {
        self.crb
    }

    pub fn bank(&self) -> Option<&BankSwitch> {
        self.bank.as_ref()
    }

    /// Bank selector from port A bits 0-1, as driven onto the pins.
    pub fn bank_selector(&self) -> u8 {
        self.port_a.read() & 0x03
    }

    /// Drives the external lines of port A (e.g. joystick, serial bus).
    pub fn set_port_a_input(&mut self, value: u8, ctx: &mut ChipContext<'_>) {
        self.port_a.external = value;
        self.update_bank(ctx);
    }

    pub fn set_port_b_input(&mut self, value: u8) {
        self.port_b.external = value;
    }

    /// All sixteen registers as [`Chip::peek`] sees them.
    pub fn registers(&self) -> [u8; 16] {
        let mut regs = [0u8; 16];
        for (offset, reg) in regs.iter_mut().enumerate() {
            *reg = self.peek(offset as u16);
        }
        regs
    }

    fn raise(&mut self, flag: u8) {
        self.icr_flags |= flag;
        self.check_interrupt();
    }

    fn check_interrupt(&mut self) {
        if self.icr_flags & self.icr_mask != 0 && !self.interrupt_pending {
            self.interrupt_pending = true;
            trace!(flags = self.icr_flags, line = ?self.line, "timer chip interrupt asserted");
        }
    }

    fn icr_value(&self) -> u8 {
        self.icr_flags | if self.interrupt_pending { 0x80 } else { 0 }
    }

    fn clock_timers(&mut self) {
        let a_underflow = self.cra & CRA_COUNT_CNT == 0 && self.timer_a.clock();
        if a_underflow {
            if !self.timer_a.running {
                self.cra &= !CR_START;
            }
            self.raise(ICR_TIMER_A);
        }
        let b_input = match self.crb & CRB_INPUT {
            0 => true,
            CRB_COUNT_CNT => false,
            _ => a_underflow,
        };
        if b_input && self.timer_b.clock() {
            if !self.timer_b.running {
                self.crb &= !CR_START;
            }
            self.raise(ICR_TIMER_B);
        }
    }

    fn update_bank(&mut self, ctx: &mut ChipContext<'_>) {
        let selector = self.bank_selector();
        if let Some(bank) = self.bank.as_mut() {
            if let Err(err) = bank.apply(selector, ctx.memory) {
                warn!(%err, selector, "timer chip bank switch rejected");
            }
        }
    }

    fn read_register(&self, offset: u16) -> u8 {
        match offset & 0x0F {
            0x0 => self.port_a.read(),
            0x1 => self.port_b.read(),
            0x2 => self.port_a.ddr,
            0x3 => self.port_b.ddr,
            0x4 => self.timer_a.counter as u8,
            0x5 => (self.timer_a.counter >> 8) as u8,
            0x6 => self.timer_b.counter as u8,
            0x7 => (self.timer_b.counter >> 8) as u8,
            0x8 => self.tod.shown(TENTHS),
            0x9 => self.tod.shown(SECONDS),
            0xA => self.tod.shown(MINUTES),
            0xB => self.tod.shown(HOURS),
            0xC => self.sdr,
            0xD => self.icr_value(),
            0xE => self.cra,
            _ => self.crb,
        }
    }
}

impl Chip for TimerChip {
    fn simulate(&mut self, cycles: u32, _ctx: &mut ChipContext<'_>) {
        for _ in 0..cycles {
            self.clock_timers();
        }
        if self.tod.advance(cycles) {
            self.raise(ICR_ALARM);
        }
        self.cycles += cycles as u64;
    }

    fn read(&mut self, offset: u16) -> u8 {
        let value = self.read_register(offset);
        match offset & 0x0F {
            // Reading hours freezes the display until tenths are read.
            0xB => {
                if self.tod.latch.is_none() {
                    self.tod.latch = Some(self.tod.time);
                }
            }
            0x8 => self.tod.latch = None,
            0xD => {
                self.icr_flags = 0;
                self.interrupt_pending = false;
            }
            _ => {}
        }
        value
    }

    fn peek(&self, offset: u16) -> u8 {
        self.read_register(offset)
    }

    fn write(&mut self, offset: u16, value: u8, ctx: &mut ChipContext<'_>) {
        let alarm = self.crb & CRB_ALARM != 0;
        match offset & 0x0F {
            0x0 => {
                self.port_a.data = value;
                self.update_bank(ctx);
            }
            0x1 => self.port_b.data = value,
            0x2 => {
                self.port_a.ddr = value;
                self.update_bank(ctx);
            }
            0x3 => self.port_b.ddr = value,
            0x4 => self.timer_a.write_latch_low(value),
            0x5 => self.timer_a.write_latch_high(value),
            0x6 => self.timer_b.write_latch_low(value),
            0x7 => self.timer_b.write_latch_high(value),
            0x8 => {
                if alarm {
                    self.tod.alarm[TENTHS] = value & 0x0F;
                } else {
                    self.tod.time[TENTHS] = value & 0x0F;
                    self.tod.stopped = false;
                }
            }
            0x9 | 0xA => {
                let index = (offset & 0x0F) as usize - 0x8;
                if alarm {
                    self.tod.alarm[index] = value & 0x7F;
                } else {
                    self.tod.time[index] = value & 0x7F;
                }
            }
            0xB => {
                if alarm {
                    self.tod.alarm[HOURS] = value & 0x9F;
                } else {
                    self.tod.time[HOURS] = value & 0x9F;
                    self.tod.stopped = true;
                }
            }
            0xC => self.sdr = value,
            0xD => {
                let bits = value & 0x1F;
                if value & 0x80 != 0 {
                    self.icr_mask |= bits;
                } else {
                    self.icr_mask &= !bits;
                }
                self.check_interrupt();
            }
            0xE => {
                self.cra = value & !CR_FORCE_LOAD;
                self.timer_a.control(value);
            }
            _ => {
                self.crb = value & !CR_FORCE_LOAD;
                self.timer_b.control(value);
            }
        }
    }

    fn reset(&mut self, ctx: &mut ChipContext<'_>) {
        let line = self.line;
        let cycles_per_tenth = self.tod.cycles_per_tenth;
        let bank = self.bank.take();
        let cycles = self.cycles;
        *self = Self::new(line, cycles_per_tenth, bank);
        self.cycles = cycles;
        if let Some(bank) = self.bank.as_mut() {
            bank.invalidate();
        }
        self.update_bank(ctx);
    }

    fn irq(&self) -> bool {
        self.interrupt_pending && self.line == InterruptLine::Irq
    }

    fn nmi(&self) -> bool {
        self.interrupt_pending && self.line == InterruptLine::Nmi
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
