//! WASM API for the machine.
//!
//! Provides JavaScript-callable interfaces for building a machine from a
//! JSON description, running it, inspecting state and grabbing frames.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::chips::ChipOutput;
use crate::presets;
use crate::{Computer, MachineConfig, ResetLevel, RunExit};

/// JavaScript-compatible error wrapper
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsError {
    message: String,
}

#[wasm_bindgen]
impl JsError {
    #[wasm_bindgen(constructor)]
    pub fn new(message: &str) -> JsError {
        JsError {
            message: message.to_string(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

fn js_error(err: impl std::fmt::Display) -> JsError {
    JsError::new(&err.to_string())
}

/// Latest completed frame of a raster chip.
#[derive(Default)]
struct FrameSlot {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    frames: u32,
}

/// Main machine interface for JavaScript
#[wasm_bindgen]
pub struct WasmComputer {
    computer: Computer,
    frame: Rc<RefCell<FrameSlot>>,
}

#[wasm_bindgen]
impl WasmComputer {
    /// Builds a machine from a JSON `MachineConfig`. Pacing is left to the
    /// page (requestAnimationFrame), so the clock is never throttled here.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmComputer, JsError> {
        let config = MachineConfig::from_json(config_json).map_err(js_error)?;
        Self::build(config)
    }

    /// A C64-style machine; `ntsc` picks the video standard.
    pub fn commodore64(ntsc: bool) -> Result<WasmComputer, JsError> {
        let standard = if ntsc {
            crate::clock::VideoStandard::Ntsc
        } else {
            crate::clock::VideoStandard::Pal
        };
        Self::build(presets::commodore64(standard))
    }

    fn build(mut config: MachineConfig) -> Result<WasmComputer, JsError> {
        config.clock.throttled = false;
        let raster = config
            .chips
            .iter()
            .find(|chip| matches!(chip.kind, crate::config::ChipKind::Raster { .. }))
            .map(|chip| chip.name.clone());
        let mut computer = Computer::new(config).map_err(js_error)?;

        let frame = Rc::new(RefCell::new(FrameSlot::default()));
        if let Some(name) = raster {
            let slot = Rc::clone(&frame);
            computer
                .subscribe(&name, move |output| {
                    let ChipOutput::Frame { width, height, pixels } = output;
                    let mut slot = slot.borrow_mut();
                    slot.width = *width;
                    slot.height = *height;
                    slot.pixels.clear();
                    slot.pixels.extend_from_slice(pixels);
                    slot.frames = slot.frames.wrapping_add(1);
                })
                .map_err(js_error)?;
        }
        Ok(WasmComputer { computer, frame })
    }

    /// Execute a single instruction; returns its cycles.
    pub fn step(&mut self) -> Result<u32, JsError> {
        self.computer.step().map_err(js_error)
    }

    /// Execute at least `cycles` cycles and return actual cycles executed.
    /// Stops early on a halted CPU.
    pub fn run_for_cycles(&mut self, cycles: u32) -> Result<u32, JsError> {
        self.computer
            .run_for_cycles(cycles as u64)
            .map(|summary| summary.cycles as u32)
            .map_err(js_error)
    }

    /// Runs one video frame's worth of cycles.
    pub fn run_frame(&mut self) -> Result<bool, JsError> {
        let budget = self.computer.clock().standard().cycles_per_frame() as u64;
        let summary = self.computer.run_for_cycles(budget).map_err(js_error)?;
        Ok(summary.exit == RunExit::ConditionMet)
    }

    /// Machine reset; `cold` also wipes RAM.
    pub fn reset(&mut self, cold: bool) {
        let level = if cold { ResetLevel::ColdStart } else { ResetLevel::Machine };
        self.computer.reset(level);
    }

    // Register getters
    #[wasm_bindgen(getter)]
    pub fn a(&self) -> u8 {
        self.computer.cpu().a()
    }

    #[wasm_bindgen(getter)]
    pub fn x(&self) -> u8 {
        self.computer.cpu().x()
    }

    #[wasm_bindgen(getter)]
    pub fn y(&self) -> u8 {
        self.computer.cpu().y()
    }

    #[wasm_bindgen(getter)]
    pub fn pc(&self) -> u16 {
        self.computer.cpu().pc()
    }

    #[wasm_bindgen(getter)]
    pub fn sp(&self) -> u8 {
        self.computer.cpu().sp()
    }

    #[wasm_bindgen(getter)]
    pub fn status(&self) -> u8 {
        self.computer.cpu().status()
    }

    #[wasm_bindgen(getter)]
    pub fn cycles(&self) -> f64 {
        self.computer.cycles() as f64 // u64 doesn't cross the boundary
    }

    #[wasm_bindgen(getter)]
    pub fn halted(&self) -> bool {
        self.computer.cpu().is_halted()
    }

    pub fn set_pc(&mut self, addr: u16) {
        self.computer.cpu_mut().set_pc(addr);
    }

    // Memory access methods

    /// Side-effect-free dump of the CPU's view.
    pub fn dump(&self, start: u16, len: usize) -> Result<Vec<u8>, JsError> {
        self.computer
            .dump(start, len)
            .map(|bytes| bytes.to_vec())
            .map_err(js_error)
    }

    /// Load a program into memory and set PC
    pub fn load_program(&mut self, program: &[u8], start_addr: u16) -> Result<(), JsError> {
        self.computer.load_program(program, start_addr).map_err(js_error)
    }

    /// Installs a ROM (or any storage) image.
    pub fn load_storage(&mut self, name: &str, image: &[u8]) -> Result<(), JsError> {
        self.computer.load_storage(name, image).map_err(js_error)
    }

    // Video

    #[wasm_bindgen(getter)]
    pub fn frame_width(&self) -> usize {
        self.frame.borrow().width
    }

    #[wasm_bindgen(getter)]
    pub fn frame_height(&self) -> usize {
        self.frame.borrow().height
    }

    /// Frames completed since construction.
    #[wasm_bindgen(getter)]
    pub fn frame_count(&self) -> u32 {
        self.frame.borrow().frames
    }

    /// Palette indices of the latest frame, row-major. Empty before the
    /// first frame completes.
    pub fn frame(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.frame.borrow().pixels.as_slice())
    }
}
