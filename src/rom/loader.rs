//! Raw ROM file loading.
//!
//! A CHIP-8 ROM is a flat binary image that is copied verbatim to 0x200.

use crate::cpu::memory::LoadError;
use std::path::Path;

/// Read a ROM image from disk.
///
/// Any I/O failure is reported as [`LoadError::SourceUnavailable`]. Size is
/// not checked here; [`Memory::load_program`](crate::cpu::Memory::load_program)
/// does that.
pub fn load_rom<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, LoadError> {
    let path = path.as_ref();
    std::fs::read(path)
        .map_err(|e| LoadError::SourceUnavailable(format!("{}: {}", path.display(), e)))
}
