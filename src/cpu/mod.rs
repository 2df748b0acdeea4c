//! CPU emulation for the CHIP-8.
//!
//! This module implements the complete CHIP-8 virtual machine:
//! - 4 KiB of memory with the hex font at 0x000
//! - 16 8-bit registers V0-VF, a 16-bit index register I and a PC
//! - a 16-level call stack, delay and sound timers
//! - a 64x32 monochrome framebuffer and a 16-key keypad

pub mod memory;
pub mod registers;
pub mod display;
pub mod keypad;
pub mod decode;
pub mod execute;

pub use memory::{Memory, LoadError};
pub use registers::{Registers, CallStack};
pub use display::Framebuffer;
pub use keypad::Keypad;
pub use decode::{Instruction, DecodeError};
pub use execute::{Cpu, CpuError, CpuState, Step};
