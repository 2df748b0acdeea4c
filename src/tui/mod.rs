//! Terminal player for CHIP-8 programs.
//!
//! Runs a program in real time in the terminal with:
//! - Half-block framebuffer rendering
//! - Register, timer and next-instruction panel
//! - Single-step and fast-forward controls

mod app;
mod ui;

pub use app::{map_key, run_player, PlayerApp, KEY_LATCH};
