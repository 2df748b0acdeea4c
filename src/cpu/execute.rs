//! CPU execution engine for the CHIP-8.
//!
//! Implements the fetch-decode-execute step and all instruction behaviors.
//! A step either commits every effect of one instruction and decays the
//! timers once, or (on error, or while waiting for a key) changes nothing
//! visible besides the machine state flag.

use crate::config::MachineConfig;
use crate::cpu::decode::{self, Instruction};
use crate::cpu::display::{DrawResult, Framebuffer};
use crate::cpu::keypad::{Keypad, KEY_COUNT};
use crate::cpu::memory::{LoadError, Memory, FONT_GLYPH_SIZE, FONT_START};
use crate::cpu::registers::{Registers, VF};
use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// Instructions execute normally.
    Running,
    /// Blocked in FX0A until a key is held; VX receives the key.
    AwaitingKey { x: u8 },
}

/// What a successful call to [`Cpu::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The instruction completed and the timers decayed.
    Executed(Instruction),
    /// FX0A found no key held; PC and timers are unchanged.
    AwaitingKey,
}

/// Whether an executed instruction completed.
enum Flow {
    Done,
    Blocked { x: u8 },
}

/// The CHIP-8 machine.
#[derive(Clone)]
pub struct Cpu {
    /// CPU registers, call stack and timers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Completed instruction count.
    pub cycles: u64,
    display: Framebuffer,
    keypad: Keypad,
    rng: StdRng,
    seed: Option<u64>,
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a machine with a 64x32 framebuffer and an entropy-seeded
    /// random generator.
    pub fn new() -> Self {
        Self::with_config(&MachineConfig::default())
    }

    /// Create a machine whose random generator is seeded deterministically.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_config(&MachineConfig {
            seed: Some(seed),
            ..MachineConfig::default()
        })
    }

    /// Create a machine from a configuration (framebuffer size and seed).
    pub fn with_config(config: &MachineConfig) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            display: Framebuffer::new(config.width, config.height),
            keypad: Keypad::new(),
            rng: Self::make_rng(config.seed),
            seed: config.seed,
            last_instr: None,
        }
    }

    fn make_rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Reset every entity to its power-on value and reseed the generator.
    /// The loaded program is discarded.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.display = Framebuffer::new(self.display.width(), self.display.height());
        self.keypad.release_all();
        self.rng = Self::make_rng(self.seed);
        self.last_instr = None;
    }

    /// Load a program into memory at 0x200.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.mem.load_program(program)?;
        debug!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Read a ROM file and load it at 0x200.
    pub fn load_rom_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), LoadError> {
        let program = crate::rom::load_rom(path)?;
        self.load_program(&program)
    }

    /// Execute a single instruction.
    ///
    /// On error nothing is committed: PC, registers, memory, stack,
    /// framebuffer and timers are as they were before the call.
    pub fn step(&mut self) -> Result<Step, CpuError> {
        // Fetch
        let pc = self.regs.pc;
        let opcode = self.mem.read_word(pc);

        // Decode
        let instr = decode::decode(opcode).map_err(|_| {
            warn!("unknown opcode {:#06X} at {:#05X}", opcode, pc);
            CpuError::UnknownOpcode { opcode, pc }
        })?;

        // Execute
        if instr.is_inert() {
            debug!("ignoring extended instruction {:?} at {:#05X}", instr, pc);
        }
        match self.execute(instr)? {
            Flow::Blocked { x } => {
                self.state = CpuState::AwaitingKey { x };
                return Ok(Step::AwaitingKey);
            }
            Flow::Done => self.state = CpuState::Running,
        }

        trace!("{:#05X}: {:04X} {:?}", pc, opcode, instr);

        self.regs.tick_timers();
        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(Step::Executed(instr))
    }

    /// Run for at most `max_steps` steps, stopping at the first error.
    ///
    /// Returns the number of steps taken, including steps spent waiting
    /// for a key.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<u64, CpuError> {
        for taken in 0..max_steps {
            if let Err(e) = self.step() {
                debug!("stopped after {} steps: {}", taken, e);
                return Err(e);
            }
        }
        Ok(max_steps)
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> Result<Flow, CpuError> {
        let pc = self.regs.pc;

        match instr {
            // ==================== Flow Control ====================

            Instruction::ClearScreen => {
                self.display.clear();
                self.regs.advance_pc();
            }

            Instruction::Return => {
                let ret = self.regs.stack.pop().ok_or_else(|| {
                    debug!("return with empty stack at {:#05X}", pc);
                    CpuError::StackUnderflow { pc }
                })?;
                self.regs.jump(ret.wrapping_add(2));
            }

            Instruction::Jump { addr } => {
                self.regs.jump(addr);
            }

            Instruction::Call { addr } => {
                self.regs.stack.push(pc).ok_or_else(|| {
                    debug!("call stack full at {:#05X}", pc);
                    CpuError::StackOverflow { pc }
                })?;
                self.regs.jump(addr);
            }

            Instruction::JumpOffset { addr } => {
                self.regs.jump(addr + self.regs.v[0] as u16);
            }

            // ==================== Conditional Skips ====================

            Instruction::SkipEqByte { x, byte } => {
                self.skip_if(self.regs.get(x) == byte);
            }

            Instruction::SkipNeByte { x, byte } => {
                self.skip_if(self.regs.get(x) != byte);
            }

            Instruction::SkipEqReg { x, y } => {
                self.skip_if(self.regs.get(x) == self.regs.get(y));
            }

            Instruction::SkipNeReg { x, y } => {
                self.skip_if(self.regs.get(x) != self.regs.get(y));
            }

            Instruction::SkipKeyPressed { x } => {
                let key = self.key_from_register(x);
                self.skip_if(self.keypad.is_pressed(key));
            }

            Instruction::SkipKeyReleased { x } => {
                let key = self.key_from_register(x);
                self.skip_if(!self.keypad.is_pressed(key));
            }

            // ==================== Register Arithmetic ====================

            Instruction::LoadByte { x, byte } => {
                self.regs.set(x, byte);
                self.regs.advance_pc();
            }

            Instruction::AddByte { x, byte } => {
                self.regs.set(x, self.regs.get(x).wrapping_add(byte));
                self.regs.advance_pc();
            }

            Instruction::Move { x, y } => {
                self.regs.set(x, self.regs.get(y));
                self.regs.advance_pc();
            }

            Instruction::Or { x, y } => {
                self.regs.set(x, self.regs.get(x) | self.regs.get(y));
                self.regs.advance_pc();
            }

            Instruction::And { x, y } => {
                self.regs.set(x, self.regs.get(x) & self.regs.get(y));
                self.regs.advance_pc();
            }

            Instruction::Xor { x, y } => {
                self.regs.set(x, self.regs.get(x) ^ self.regs.get(y));
                self.regs.advance_pc();
            }

            // For every flag-producing instruction the result is written
            // first and VF last, so VF holds the flag even when X is F.

            Instruction::AddReg { x, y } => {
                let (sum, carry) = self.regs.get(x).overflowing_add(self.regs.get(y));
                self.regs.set(x, sum);
                self.regs.set_flag(carry);
                self.regs.advance_pc();
            }

            Instruction::SubReg { x, y } => {
                let (diff, borrow) = self.regs.get(x).overflowing_sub(self.regs.get(y));
                self.regs.set(x, diff);
                self.regs.set_flag(!borrow);
                self.regs.advance_pc();
            }

            Instruction::SubNeg { x, y } => {
                let (diff, borrow) = self.regs.get(y).overflowing_sub(self.regs.get(x));
                self.regs.set(x, diff);
                self.regs.set_flag(!borrow);
                self.regs.advance_pc();
            }

            Instruction::ShiftRight { x, .. } => {
                let vx = self.regs.get(x);
                self.regs.set(x, vx >> 1);
                self.regs.v[VF] = vx & 0x1;
                self.regs.advance_pc();
            }

            Instruction::ShiftLeft { x, .. } => {
                let vx = self.regs.get(x);
                self.regs.set(x, vx << 1);
                self.regs.v[VF] = vx >> 7;
                self.regs.advance_pc();
            }

            Instruction::Random { x, byte } => {
                let value: u8 = self.rng.random();
                self.regs.set(x, value & byte);
                self.regs.advance_pc();
            }

            // ==================== Index, Timers, Memory ====================

            Instruction::LoadIndex { addr } => {
                self.regs.i = addr;
                self.regs.advance_pc();
            }

            Instruction::AddIndex { x } => {
                let i = self.regs.i.wrapping_add(self.regs.get(x) as u16);
                self.regs.i = i;
                self.regs.set_flag(i > 0x0FFF);
                self.regs.advance_pc();
            }

            Instruction::LoadFont { x } => {
                self.regs.i = FONT_START as u16 + self.regs.get(x) as u16 * FONT_GLYPH_SIZE;
                self.regs.advance_pc();
            }

            Instruction::StoreBcd { x } => {
                let value = self.regs.get(x);
                let i = self.regs.i;
                self.mem.write(i, value / 100);
                self.mem.write(i.wrapping_add(1), (value / 10) % 10);
                self.mem.write(i.wrapping_add(2), value % 10);
                self.regs.advance_pc();
            }

            Instruction::StoreRegisters { x } => {
                let i = self.regs.i;
                for r in 0..=x {
                    self.mem.write(i.wrapping_add(r as u16), self.regs.get(r));
                }
                self.regs.i = i.wrapping_add(x as u16 + 1);
                self.regs.advance_pc();
            }

            Instruction::LoadRegisters { x } => {
                let i = self.regs.i;
                for r in 0..=x {
                    self.regs.set(r, self.mem.read(i.wrapping_add(r as u16)));
                }
                self.regs.i = i.wrapping_add(x as u16 + 1);
                self.regs.advance_pc();
            }

            Instruction::LoadDelay { x } => {
                self.regs.set(x, self.regs.delay_timer);
                self.regs.advance_pc();
            }

            Instruction::SetDelay { x } => {
                self.regs.delay_timer = self.regs.get(x);
                self.regs.advance_pc();
            }

            Instruction::SetSound { x } => {
                self.regs.sound_timer = self.regs.get(x);
                self.regs.advance_pc();
            }

            // ==================== Display & Input ====================

            Instruction::Draw { x, y, rows } => {
                let result = self.draw(x, y, rows);
                self.regs.set_flag(result.collision);
                self.regs.advance_pc();
            }

            Instruction::WaitKey { x } => match self.keypad.first_pressed() {
                Some(key) => {
                    self.regs.set(x, key);
                    self.regs.advance_pc();
                }
                None => return Ok(Flow::Blocked { x }),
            },

            // ==================== Inert Extensions ====================

            Instruction::ScrollDown { .. }
            | Instruction::ScrollRight
            | Instruction::ScrollLeft
            | Instruction::Exit
            | Instruction::LowRes
            | Instruction::HighRes
            | Instruction::LoadLargeFont { .. }
            | Instruction::SaveFlags { .. }
            | Instruction::LoadFlags { .. } => {
                self.regs.advance_pc();
            }
        }

        Ok(Flow::Done)
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.regs.skip();
        } else {
            self.regs.advance_pc();
        }
    }

    /// Key index held in VX; only the low nibble selects a key.
    fn key_from_register(&self, x: u8) -> u8 {
        let value = self.regs.get(x);
        if value as usize >= KEY_COUNT {
            trace!("key index {:#04X} in V{:X} masked to {:X}", value, x, value & 0xF);
        }
        value & 0xF
    }

    /// Draw `rows` sprite rows from memory at I to (VX, VY).
    fn draw(&mut self, x: u8, y: u8, rows: u8) -> DrawResult {
        let mut sprite = [0u8; 15];
        let sprite = &mut sprite[..rows as usize];
        for (row, byte) in sprite.iter_mut().enumerate() {
            *byte = self.mem.read(self.regs.i.wrapping_add(row as u16));
        }

        let (px, py) = (self.regs.get(x) as usize, self.regs.get(y) as usize);
        let result = self.display.draw_sprite(px, py, sprite);
        if result.clipped > 0 {
            trace!("sprite at ({}, {}) clipped {} pixels", px, py, result.clipped);
        }
        result
    }

    // ==================== Host Interface ====================

    /// Framebuffer contents, `width * height` bytes of 0 or 1.
    pub fn graphics(&self) -> &[u8] {
        self.display.pixels()
    }

    /// The framebuffer.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.display
    }

    /// Framebuffer width in pixels.
    pub fn width(&self) -> usize {
        self.display.width()
    }

    /// Framebuffer height in pixels.
    pub fn height(&self) -> usize {
        self.display.height()
    }

    /// True if the framebuffer changed since the last [`clear_redraw`](Self::clear_redraw).
    pub fn needs_redraw(&self) -> bool {
        self.display.is_dirty()
    }

    /// Mark the framebuffer as rendered.
    pub fn clear_redraw(&mut self) {
        self.display.clear_dirty();
    }

    /// Press or release a key (0-F).
    pub fn set_key(&mut self, key: usize, pressed: bool) -> Result<(), CpuError> {
        if key >= KEY_COUNT {
            return Err(CpuError::InvalidKey(key));
        }
        self.keypad.set(key as u8, pressed);
        Ok(())
    }

    /// Whether a key (0-F) is held.
    pub fn is_key_pressed(&self, key: u8) -> bool {
        self.keypad.is_pressed(key)
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is blocked waiting for a key.
    pub fn is_awaiting_key(&self) -> bool {
        matches!(self.state, CpuState::AwaitingKey { .. })
    }

    /// A serializable view of the registers and execution state.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            registers: &self.regs,
            state: self.state,
            cycles: self.cycles,
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("display", &self.display)
            .finish()
    }
}

/// Register and state dump, for `--dump-state` and the wasm bindings.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub registers: &'a Registers,
    pub state: CpuState,
    pub cycles: u64,
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("unknown opcode {opcode:#06X} at {pc:#05X}")]
    UnknownOpcode { opcode: u16, pc: u16 },

    #[error("call stack overflow at {pc:#05X}")]
    StackOverflow { pc: u16 },

    #[error("return with empty call stack at {pc:#05X}")]
    StackUnderflow { pc: u16 },

    #[error("key index {0} out of range (0-15)")]
    InvalidKey(usize),
}
