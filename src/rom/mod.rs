//! ROM files and disassembly.
//!
//! This module provides:
//! - Loading raw program bytes from disk
//! - A disassembler (opcode words → readable mnemonics)

pub mod disasm;
pub mod loader;

pub use disasm::{disassemble, disassemble_instruction};
pub use loader::load_rom;
