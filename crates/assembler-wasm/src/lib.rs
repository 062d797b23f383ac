//! WebAssembly bindings for the SegWit block assembler.
//!
//! This crate provides JavaScript-accessible APIs for:
//! - Loading candidate transactions from JS objects
//! - Selecting transactions through a JS signature verifier
//! - Mining the block header in caller-sized batches
//! - Reading back the finished block

use wasm_bindgen::prelude::*;

pub mod miner;
pub mod state;

// Re-export main types for JS access
pub use miner::Miner;

/// Initialize the WASM module with better panic messages.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Block subsidy in satoshis at `height`.
#[wasm_bindgen]
pub fn block_subsidy(height: u32) -> u64 {
    assembler_core::block_subsidy(height)
}
