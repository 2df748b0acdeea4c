//! CHIP-8 registers, call stack and timers.
//!
//! - V0-VF: 16 general purpose 8-bit registers. VF doubles as the flag
//!   register for carry, borrow, shift-out and sprite collision.
//! - I: 16-bit index register, used as a memory pointer.
//! - PC: 16-bit program counter.
//! - A 16-level call stack of return addresses.
//! - Delay and sound timers, each counting down to zero.

use crate::cpu::memory::PROGRAM_START;
use serde::{Deserialize, Serialize};

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 16;

/// Index of the flag register.
pub const VF: usize = 0xF;

/// Maximum nesting depth of subroutine calls.
pub const STACK_DEPTH: usize = 16;

/// Fixed-size call stack with an explicit stack pointer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStack {
    slots: [u16; STACK_DEPTH],
    sp: usize,
}

impl CallStack {
    /// Create an empty stack.
    pub const fn new() -> Self {
        Self {
            slots: [0; STACK_DEPTH],
            sp: 0,
        }
    }

    /// Push a return address. Returns `None` if the stack is full,
    /// in which case nothing is changed.
    pub fn push(&mut self, addr: u16) -> Option<()> {
        let slot = self.slots.get_mut(self.sp)?;
        *slot = addr;
        self.sp += 1;
        Some(())
    }

    /// Pop a return address, or `None` if the stack is empty.
    pub fn pop(&mut self) -> Option<u16> {
        let sp = self.sp.checked_sub(1)?;
        self.sp = sp;
        Some(self.slots[sp])
    }

    /// Current stack pointer (number of pending calls).
    pub fn depth(&self) -> usize {
        self.sp
    }

    /// True if another push would overflow.
    pub fn is_full(&self) -> bool {
        self.sp == STACK_DEPTH
    }

    /// The pending return addresses, oldest first.
    pub fn frames(&self) -> &[u16] {
        &self.slots[..self.sp]
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

/// The CHIP-8 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// V0-VF general purpose registers
    pub v: [u8; REGISTER_COUNT],

    /// I: index register (may exceed 0xFFF; addresses are masked on use)
    pub i: u16,

    /// PC: address of the next instruction to fetch
    pub pc: u16,

    /// Return addresses of pending subroutine calls
    pub stack: CallStack,

    /// Delay timer, readable by programs
    pub delay_timer: u8,

    /// Sound timer; tracked as a value only
    pub sound_timer: u8,
}

impl Registers {
    /// Create a register file in its power-on state (PC = 0x200).
    pub fn new() -> Self {
        Self {
            v: [0; REGISTER_COUNT],
            i: 0,
            pc: PROGRAM_START,
            stack: CallStack::new(),
            delay_timer: 0,
            sound_timer: 0,
        }
    }

    /// Reset all registers to their power-on values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a general purpose register. The index is masked to 0-F.
    #[inline]
    pub fn get(&self, index: u8) -> u8 {
        self.v[(index & 0xF) as usize]
    }

    /// Write a general purpose register. The index is masked to 0-F.
    #[inline]
    pub fn set(&mut self, index: u8, value: u8) {
        self.v[(index & 0xF) as usize] = value;
    }

    /// Write the flag register VF.
    #[inline]
    pub fn set_flag(&mut self, flag: bool) {
        self.v[VF] = flag as u8;
    }

    /// Advance the program counter past one instruction.
    #[inline]
    pub fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// Advance the program counter past two instructions.
    #[inline]
    pub fn skip(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }

    /// Set the program counter to an absolute address.
    #[inline]
    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }

    /// Decrement both timers by one, stopping at zero.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_state() {
        let regs = Registers::new();
        assert_eq!(regs.pc, 0x200);
        assert_eq!(regs.i, 0);
        assert_eq!(regs.v, [0; 16]);
        assert_eq!(regs.stack.depth(), 0);
        assert_eq!((regs.delay_timer, regs.sound_timer), (0, 0));
    }

    #[test]
    fn test_stack_push_pop() {
        let mut stack = CallStack::new();
        stack.push(0x200).unwrap();
        stack.push(0x300).unwrap();

        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.frames(), &[0x200, 0x300]);
        assert_eq!(stack.pop(), Some(0x300));
        assert_eq!(stack.pop(), Some(0x200));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_stack_overflow_leaves_stack_unchanged() {
        let mut stack = CallStack::new();
        for n in 0..STACK_DEPTH as u16 {
            stack.push(n).unwrap();
        }
        assert!(stack.is_full());

        let before = stack.clone();
        assert_eq!(stack.push(0xABC), None);
        assert_eq!(stack, before);
    }

    #[test]
    fn test_timers_floor_at_zero() {
        let mut regs = Registers::new();
        regs.delay_timer = 2;
        regs.sound_timer = 1;

        regs.tick_timers();
        assert_eq!((regs.delay_timer, regs.sound_timer), (1, 0));

        regs.tick_timers();
        regs.tick_timers();
        assert_eq!((regs.delay_timer, regs.sound_timer), (0, 0));
    }

    #[test]
    fn test_register_index_masked() {
        let mut regs = Registers::new();
        regs.set(0x13, 7);
        assert_eq!(regs.get(0x3), 7);
    }

    #[test]
    fn test_pc_helpers() {
        let mut regs = Registers::new();
        regs.advance_pc();
        assert_eq!(regs.pc, 0x202);
        regs.skip();
        assert_eq!(regs.pc, 0x206);
        regs.jump(0x400);
        assert_eq!(regs.pc, 0x400);
    }
}
