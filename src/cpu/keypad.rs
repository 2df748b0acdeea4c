//! Hexadecimal keypad state.
//!
//! Sixteen keys, 0-F. Written by the host, read by the skip-on-key and
//! wait-for-key instructions.

/// Number of keys on the keypad.
pub const KEY_COUNT: usize = 16;

/// Pressed/released state of each key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; KEY_COUNT],
}

impl Keypad {
    /// All keys released.
    pub const fn new() -> Self {
        Self {
            keys: [false; KEY_COUNT],
        }
    }

    /// Set the state of a key. The index is masked to 0-F.
    pub fn set(&mut self, key: u8, pressed: bool) {
        self.keys[(key & 0xF) as usize] = pressed;
    }

    /// Whether a key is held. The index is masked to 0-F.
    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys[(key & 0xF) as usize]
    }

    /// The lowest-numbered key currently held, if any.
    pub fn first_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|k| *k).map(|k| k as u8)
    }

    /// Release every key.
    pub fn release_all(&mut self) {
        self.keys = [false; KEY_COUNT];
    }
}
