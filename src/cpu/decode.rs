//! Instruction decoder for the CHIP-8.
//!
//! Every instruction is one big-endian 16-bit word. The high nibble selects
//! one of 16 families; families 0x0, 0x8, 0xE and 0xF sub-dispatch on the
//! low byte or low nibble.
//!
//! Operand fields:
//! - `X`: bits 11-8, register index
//! - `Y`: bits 7-4, register index
//! - `N`: bits 3-0, 4-bit literal
//! - `NN`: bits 7-0, 8-bit literal
//! - `NNN`: bits 11-0, 12-bit address

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decoded CHIP-8 instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Flow Control ====================

    /// 00E0: clear the framebuffer
    ClearScreen,

    /// 00EE: return from subroutine
    Return,

    /// 1NNN: PC := NNN
    Jump { addr: u16 },

    /// 2NNN: push PC, PC := NNN
    Call { addr: u16 },

    /// BNNN: PC := NNN + V0
    JumpOffset { addr: u16 },

    // ==================== Conditional Skips ====================

    /// 3XNN: skip if VX == NN
    SkipEqByte { x: u8, byte: u8 },

    /// 4XNN: skip if VX != NN
    SkipNeByte { x: u8, byte: u8 },

    /// 5XY0: skip if VX == VY
    SkipEqReg { x: u8, y: u8 },

    /// 9XY0: skip if VX != VY
    SkipNeReg { x: u8, y: u8 },

    /// EX9E: skip if key VX is held
    SkipKeyPressed { x: u8 },

    /// EXA1: skip if key VX is not held
    SkipKeyReleased { x: u8 },

    // ==================== Register Arithmetic ====================

    /// 6XNN: VX := NN
    LoadByte { x: u8, byte: u8 },

    /// 7XNN: VX := VX + NN, no flag
    AddByte { x: u8, byte: u8 },

    /// 8XY0: VX := VY
    Move { x: u8, y: u8 },

    /// 8XY1: VX := VX | VY
    Or { x: u8, y: u8 },

    /// 8XY2: VX := VX & VY
    And { x: u8, y: u8 },

    /// 8XY3: VX := VX ^ VY
    Xor { x: u8, y: u8 },

    /// 8XY4: VX := VX + VY, VF := carry
    AddReg { x: u8, y: u8 },

    /// 8XY5: VX := VX - VY, VF := NOT borrow
    SubReg { x: u8, y: u8 },

    /// 8XY6: VF := VX & 1, VX := VX >> 1
    ShiftRight { x: u8, y: u8 },

    /// 8XY7: VX := VY - VX, VF := NOT borrow
    SubNeg { x: u8, y: u8 },

    /// 8XYE: VF := VX >> 7, VX := VX << 1
    ShiftLeft { x: u8, y: u8 },

    /// CXNN: VX := random & NN
    Random { x: u8, byte: u8 },

    // ==================== Index, Timers, Memory ====================

    /// ANNN: I := NNN
    LoadIndex { addr: u16 },

    /// FX1E: I := I + VX, VF := I > 0xFFF
    AddIndex { x: u8 },

    /// FX29: I := address of the font glyph for VX
    LoadFont { x: u8 },

    /// FX33: store the BCD digits of VX at I, I+1, I+2
    StoreBcd { x: u8 },

    /// FX55: store V0..=VX at I, then I += X + 1
    StoreRegisters { x: u8 },

    /// FX65: load V0..=VX from I, then I += X + 1
    LoadRegisters { x: u8 },

    /// FX07: VX := delay timer
    LoadDelay { x: u8 },

    /// FX15: delay timer := VX
    SetDelay { x: u8 },

    /// FX18: sound timer := VX
    SetSound { x: u8 },

    // ==================== Display & Input ====================

    /// DXYN: draw an N-row sprite from I at (VX, VY), VF := collision
    Draw { x: u8, y: u8, rows: u8 },

    /// FX0A: wait for a key press, VX := key
    WaitKey { x: u8 },

    // ==================== Inert Extensions ====================

    /// 00CN: scroll down N rows (extended dialect, ignored)
    ScrollDown { rows: u8 },

    /// 00FB: scroll right (extended dialect, ignored)
    ScrollRight,

    /// 00FC: scroll left (extended dialect, ignored)
    ScrollLeft,

    /// 00FD: exit the interpreter (extended dialect, ignored)
    Exit,

    /// 00FE: low resolution mode (extended dialect, ignored)
    LowRes,

    /// 00FF: high resolution mode (extended dialect, ignored)
    HighRes,

    /// FX30: point I at the large font glyph for VX (extended dialect, ignored)
    LoadLargeFont { x: u8 },

    /// FX75: save V0..=VX to flag storage (extended dialect, ignored)
    SaveFlags { x: u8 },

    /// FX85: load V0..=VX from flag storage (extended dialect, ignored)
    LoadFlags { x: u8 },
}

impl Instruction {
    /// True for extended-dialect instructions that decode but have no effect.
    pub fn is_inert(&self) -> bool {
        matches!(
            self,
            Instruction::ScrollDown { .. }
                | Instruction::ScrollRight
                | Instruction::ScrollLeft
                | Instruction::Exit
                | Instruction::LowRes
                | Instruction::HighRes
                | Instruction::LoadLargeFont { .. }
                | Instruction::SaveFlags { .. }
                | Instruction::LoadFlags { .. }
        )
    }
}

/// Field extraction and dispatch masks for a raw opcode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    pub const FAMILY_MASK: u16 = 0xF000;
    pub const LOW_BYTE_MASK: u16 = 0x00FF;
    pub const LOW_NIBBLE_MASK: u16 = 0x000F;
    pub const ADDR_MASK: u16 = 0x0FFF;

    /// Bits 15-12.
    #[inline]
    pub const fn family(self) -> u16 {
        self.0 & Self::FAMILY_MASK
    }

    /// Bits 11-8.
    #[inline]
    pub const fn x(self) -> u8 {
        ((self.0 & 0x0F00) >> 8) as u8
    }

    /// Bits 7-4.
    #[inline]
    pub const fn y(self) -> u8 {
        ((self.0 & 0x00F0) >> 4) as u8
    }

    /// Bits 3-0.
    #[inline]
    pub const fn n(self) -> u8 {
        (self.0 & Self::LOW_NIBBLE_MASK) as u8
    }

    /// Bits 7-0.
    #[inline]
    pub const fn nn(self) -> u8 {
        (self.0 & Self::LOW_BYTE_MASK) as u8
    }

    /// Bits 11-0.
    #[inline]
    pub const fn nnn(self) -> u16 {
        self.0 & Self::ADDR_MASK
    }
}

/// Decode a 16-bit opcode word.
pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
    let op = Opcode(word);
    let (x, y) = (op.x(), op.y());
    let unknown = Err(DecodeError::UnknownOpcode(word));

    let instruction = match op.family() {
        0x0000 => match word & Opcode::LOW_BYTE_MASK {
            // 0NNN machine code calls are not supported
            _ if x != 0 => return unknown,
            0x00E0 => Instruction::ClearScreen,
            0x00EE => Instruction::Return,
            0x00FB => Instruction::ScrollRight,
            0x00FC => Instruction::ScrollLeft,
            0x00FD => Instruction::Exit,
            0x00FE => Instruction::LowRes,
            0x00FF => Instruction::HighRes,
            low if low & 0x00F0 == 0x00C0 => Instruction::ScrollDown { rows: op.n() },
            _ => return unknown,
        },
        0x1000 => Instruction::Jump { addr: op.nnn() },
        0x2000 => Instruction::Call { addr: op.nnn() },
        0x3000 => Instruction::SkipEqByte { x, byte: op.nn() },
        0x4000 => Instruction::SkipNeByte { x, byte: op.nn() },
        // the low nibble of 5XY? and 9XY? is not checked
        0x5000 => Instruction::SkipEqReg { x, y },
        0x6000 => Instruction::LoadByte { x, byte: op.nn() },
        0x7000 => Instruction::AddByte { x, byte: op.nn() },
        0x8000 => match word & Opcode::LOW_NIBBLE_MASK {
            0x0 => Instruction::Move { x, y },
            0x1 => Instruction::Or { x, y },
            0x2 => Instruction::And { x, y },
            0x3 => Instruction::Xor { x, y },
            0x4 => Instruction::AddReg { x, y },
            0x5 => Instruction::SubReg { x, y },
            0x6 => Instruction::ShiftRight { x, y },
            0x7 => Instruction::SubNeg { x, y },
            0xE => Instruction::ShiftLeft { x, y },
            _ => return unknown,
        },
        0x9000 => Instruction::SkipNeReg { x, y },
        0xA000 => Instruction::LoadIndex { addr: op.nnn() },
        0xB000 => Instruction::JumpOffset { addr: op.nnn() },
        0xC000 => Instruction::Random { x, byte: op.nn() },
        0xD000 => Instruction::Draw { x, y, rows: op.n() },
        0xE000 => match word & Opcode::LOW_BYTE_MASK {
            0x9E => Instruction::SkipKeyPressed { x },
            0xA1 => Instruction::SkipKeyReleased { x },
            _ => return unknown,
        },
        0xF000 => match word & Opcode::LOW_BYTE_MASK {
            0x07 => Instruction::LoadDelay { x },
            0x0A => Instruction::WaitKey { x },
            0x15 => Instruction::SetDelay { x },
            0x18 => Instruction::SetSound { x },
            0x1E => Instruction::AddIndex { x },
            0x29 => Instruction::LoadFont { x },
            0x30 => Instruction::LoadLargeFont { x },
            0x33 => Instruction::StoreBcd { x },
            0x55 => Instruction::StoreRegisters { x },
            0x65 => Instruction::LoadRegisters { x },
            0x75 => Instruction::SaveFlags { x },
            0x85 => Instruction::LoadFlags { x },
            _ => return unknown,
        },
        _ => unreachable!("family is a single nibble"),
    };

    Ok(instruction)
}

/// Encode an instruction back to its 16-bit opcode word.
pub fn encode(instr: &Instruction) -> u16 {
    fn xy(family: u16, x: u8, y: u8, n: u16) -> u16 {
        family | ((x as u16 & 0xF) << 8) | ((y as u16 & 0xF) << 4) | (n & 0xF)
    }
    fn xnn(family: u16, x: u8, byte: u8) -> u16 {
        family | ((x as u16 & 0xF) << 8) | byte as u16
    }
    fn nnn(family: u16, addr: u16) -> u16 {
        family | (addr & Opcode::ADDR_MASK)
    }

    match *instr {
        Instruction::ClearScreen => 0x00E0,
        Instruction::Return => 0x00EE,
        Instruction::ScrollDown { rows } => 0x00C0 | (rows as u16 & 0xF),
        Instruction::ScrollRight => 0x00FB,
        Instruction::ScrollLeft => 0x00FC,
        Instruction::Exit => 0x00FD,
        Instruction::LowRes => 0x00FE,
        Instruction::HighRes => 0x00FF,
        Instruction::Jump { addr } => nnn(0x1000, addr),
        Instruction::Call { addr } => nnn(0x2000, addr),
        Instruction::SkipEqByte { x, byte } => xnn(0x3000, x, byte),
        Instruction::SkipNeByte { x, byte } => xnn(0x4000, x, byte),
        Instruction::SkipEqReg { x, y } => xy(0x5000, x, y, 0x0),
        Instruction::LoadByte { x, byte } => xnn(0x6000, x, byte),
        Instruction::AddByte { x, byte } => xnn(0x7000, x, byte),
        Instruction::Move { x, y } => xy(0x8000, x, y, 0x0),
        Instruction::Or { x, y } => xy(0x8000, x, y, 0x1),
        Instruction::And { x, y } => xy(0x8000, x, y, 0x2),
        Instruction::Xor { x, y } => xy(0x8000, x, y, 0x3),
        Instruction::AddReg { x, y } => xy(0x8000, x, y, 0x4),
        Instruction::SubReg { x, y } => xy(0x8000, x, y, 0x5),
        Instruction::ShiftRight { x, y } => xy(0x8000, x, y, 0x6),
        Instruction::SubNeg { x, y } => xy(0x8000, x, y, 0x7),
        Instruction::ShiftLeft { x, y } => xy(0x8000, x, y, 0xE),
        Instruction::SkipNeReg { x, y } => xy(0x9000, x, y, 0x0),
        Instruction::LoadIndex { addr } => nnn(0xA000, addr),
        Instruction::JumpOffset { addr } => nnn(0xB000, addr),
        Instruction::Random { x, byte } => xnn(0xC000, x, byte),
        Instruction::Draw { x, y, rows } => xy(0xD000, x, y, rows as u16),
        Instruction::SkipKeyPressed { x } => xnn(0xE000, x, 0x9E),
        Instruction::SkipKeyReleased { x } => xnn(0xE000, x, 0xA1),
        Instruction::LoadDelay { x } => xnn(0xF000, x, 0x07),
        Instruction::WaitKey { x } => xnn(0xF000, x, 0x0A),
        Instruction::SetDelay { x } => xnn(0xF000, x, 0x15),
        Instruction::SetSound { x } => xnn(0xF000, x, 0x18),
        Instruction::AddIndex { x } => xnn(0xF000, x, 0x1E),
        Instruction::LoadFont { x } => xnn(0xF000, x, 0x29),
        Instruction::LoadLargeFont { x } => xnn(0xF000, x, 0x30),
        Instruction::StoreBcd { x } => xnn(0xF000, x, 0x33),
        Instruction::StoreRegisters { x } => xnn(0xF000, x, 0x55),
        Instruction::LoadRegisters { x } => xnn(0xF000, x, 0x65),
        Instruction::SaveFlags { x } => xnn(0xF000, x, 0x75),
        Instruction::LoadFlags { x } => xnn(0xF000, x, 0x85),
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode: {0:#06X}")]
    UnknownOpcode(u16),
}
