//! CHIP-8 memory subsystem.
//!
//! 4 KiB of byte-addressable RAM. The first 512 bytes (0x000-0x1FF) are
//! reserved for the interpreter; the built-in hex font lives at 0x000-0x04F.
//! Programs are loaded at 0x200.

use thiserror::Error;

/// The number of bytes of addressable memory.
pub const MEMORY_SIZE: usize = 4096;

/// Address at which programs are loaded and execution starts.
pub const PROGRAM_START: u16 = 0x200;

/// Mask applied to every computed address (12-bit address space).
pub const ADDRESS_MASK: u16 = 0x0FFF;

/// Address of the first font glyph.
pub const FONT_START: usize = 0x000;

/// Bytes per font glyph.
pub const FONT_GLYPH_SIZE: u16 = 5;

/// The built-in hex font: 16 glyphs (0-F), 5 rows of 8 pixels each.
pub const FONT_SET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// CHIP-8 memory: 4096 bytes, font preloaded.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Box<[u8; MEMORY_SIZE]>,
}

impl Memory {
    /// Create memory with the font loaded and everything else zeroed.
    pub fn new() -> Self {
        let mut bytes = Box::new([0u8; MEMORY_SIZE]);
        bytes[FONT_START..FONT_START + FONT_SET.len()].copy_from_slice(&FONT_SET);
        Self { bytes }
    }

    /// Read a byte. The address wraps into the 12-bit address space.
    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[(addr & ADDRESS_MASK) as usize]
    }

    /// Write a byte. The address wraps into the 12-bit address space.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        self.bytes[(addr & ADDRESS_MASK) as usize] = value;
    }

    /// Read a big-endian 16-bit word. Both byte addresses wrap independently,
    /// so a word at 0xFFF takes its low byte from 0x000.
    #[inline]
    pub fn read_word(&self, addr: u16) -> u16 {
        let hi = self.read(addr) as u16;
        let lo = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Restore the power-on contents: font at 0x000, zeroes elsewhere.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Copy a program into memory at 0x200.
    ///
    /// Fails with [`LoadError::OversizeProgram`] if the program does not fit,
    /// in which case memory is left untouched.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        let start = PROGRAM_START as usize;
        let available = MEMORY_SIZE - start;
        if program.len() > available {
            return Err(LoadError::OversizeProgram {
                size: program.len(),
                available,
            });
        }

        self.bytes[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Borrow a range of memory for inspection (debugger views).
    /// Returns fewer bytes if the range runs past the end of memory.
    pub fn slice(&self, start: u16, len: usize) -> &[u8] {
        let start = (start & ADDRESS_MASK) as usize;
        let end = (start + len).min(MEMORY_SIZE);
        &self.bytes[start..end]
    }

    /// The whole of memory.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count program space; the font region is always populated
        let non_zero = self.bytes[PROGRAM_START as usize..]
            .iter()
            .filter(|b| **b != 0)
            .count();

        f.debug_struct("Memory")
            .field("non_zero_program_bytes", &non_zero)
            .field("total_bytes", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur while loading a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Program is too large to fit between 0x200 and the end of memory.
    #[error("program size {size} exceeds available space {available}")]
    OversizeProgram { size: usize, available: usize },

    /// The program bytes could not be obtained.
    #[error("program source unavailable: {0}")]
    SourceUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_font_loaded_and_rest_zeroed() {
        let mem = Memory::new();
        assert_eq!(&mem.as_bytes()[..80], &FONT_SET[..]);
        assert!(mem.as_bytes()[80..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_read_write_wraps() {
        let mut mem = Memory::new();
        mem.write(0x1234, 0xAB);
        assert_eq!(mem.read(0x234), 0xAB);
        assert_eq!(mem.read(0xF234), 0xAB);
    }

    #[test]
    fn test_read_word_big_endian() {
        let mut mem = Memory::new();
        mem.write(0x300, 0x12);
        mem.write(0x301, 0x34);
        assert_eq!(mem.read_word(0x300), 0x1234);
    }

    #[test]
    fn test_read_word_at_top_of_memory() {
        let mut mem = Memory::new();
        mem.write(0xFFF, 0xA2);
        // low byte comes from 0x000, the first font byte
        assert_eq!(mem.read_word(0xFFF), 0xA2F0);
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(&[0x00, 0xE0, 0x12, 0x00]).unwrap();

        assert_eq!(mem.slice(0x200, 4), &[0x00, 0xE0, 0x12, 0x00]);
        assert_eq!(mem.read(0x204), 0);
    }

    #[test]
    fn test_load_program_exact_fit() {
        let mut mem = Memory::new();
        let program = vec![0x5A; MEMORY_SIZE - PROGRAM_START as usize];

        mem.load_program(&program).unwrap();

        assert_eq!(mem.read(0x200), 0x5A);
        assert_eq!(mem.read(0xFFF), 0x5A);
        assert_eq!(&mem.as_bytes()[..80], &FONT_SET[..]);
    }

    #[test]
    fn test_load_program_oversize_leaves_memory_untouched() {
        let mut mem = Memory::new();
        mem.load_program(&[1, 2, 3]).unwrap();
        let before = mem.clone();

        let program = vec![0xFF; MEMORY_SIZE - PROGRAM_START as usize + 1];
        let err = mem.load_program(&program).unwrap_err();

        assert_eq!(
            err,
            LoadError::OversizeProgram { size: 3585, available: 3584 }
        );
        assert!(mem == before);
    }

    #[test]
    fn test_clear_restores_power_on_state() {
        let mut mem = Memory::new();
        mem.load_program(&[9; 16]).unwrap();
        mem.write(0x010, 0);

        mem.clear();

        assert!(mem == Memory::new());
    }

    #[test]
    fn test_slice_clamps_to_end() {
        let mem = Memory::new();
        assert_eq!(mem.slice(0xFFE, 8).len(), 2);
    }

    proptest! {
        #[test]
        fn test_load_preserves_everything_outside_program(
            program in proptest::collection::vec(any::<u8>(), 0..512)
        ) {
            let mut mem = Memory::new();
            mem.load_program(&program).unwrap();

            let end = PROGRAM_START as usize + program.len();
            prop_assert_eq!(&mem.as_bytes()[0x200..end], &program[..]);
            prop_assert_eq!(&mem.as_bytes()[..80], &FONT_SET[..]);
            prop_assert!(mem.as_bytes()[end..].iter().all(|b| *b == 0));
        }
    }
}
