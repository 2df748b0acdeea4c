//! # CHIP-8 Emulator
//!
//! An interpreter for the CHIP-8 virtual machine: an 8-bit instruction set
//! with sixteen registers, 4 KiB of memory, a call stack, two countdown
//! timers and a 64x32 monochrome framebuffer.
//!
//! The [`Cpu`] advances one instruction per [`Cpu::step`]; a host decides
//! the cadence, forwards key state and renders the framebuffer.

pub mod config;
pub mod cpu;
pub mod rom;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use config::{ConfigError, MachineConfig};
pub use cpu::{Cpu, CpuError, CpuState, Framebuffer, Instruction, LoadError, Step};
pub use rom::{disassemble, disassemble_instruction, load_rom};

#[cfg(feature = "tui")]
pub use tui::run_player;
