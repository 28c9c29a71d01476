//! Fuzz target for the full C64 layout.
//!
//! Random code in RAM with the processor port, timers and raster chip all
//! live. Bank switches and chip register writes must never panic, and
//! inspection must agree with itself.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mos_machine::{presets, Computer, VideoStandard};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let mut config = presets::commodore64(VideoStandard::Pal);
    config.clock.throttled = false;
    let Ok(mut computer) = Computer::new(config) else {
        return;
    };
    let mut kernal = vec![0xEA; 0x2000];
    kernal[0x1FFA..].copy_from_slice(&[0x00, 0x03, 0x00, 0x02, 0x00, 0x03]);
    if computer.load_storage("kernal", &kernal).is_err() {
        return;
    }
    let program = &data[..data.len().min(0x0E00)];
    if computer.load_program(program, 0x0200).is_err() {
        return;
    }

    let _ = computer.run_for_cycles(20_000);

    let first = computer.dump(0x0000, 0x10000).map(|bytes| bytes.to_vec());
    let second = computer.dump(0x0000, 0x10000).map(|bytes| bytes.to_vec());
    assert_eq!(first, second);
});
