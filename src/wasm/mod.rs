//! WebAssembly bindings for the machine.
//!
//! This module provides JavaScript-callable interfaces to [`Computer`],
//! so a page can build a machine, drive it frame by frame and draw the
//! raster chip's output.
//!
//! [`Computer`]: crate::Computer

#[cfg(feature = "wasm")]
pub mod api;

#[cfg(feature = "wasm")]
pub use api::WasmComputer;
