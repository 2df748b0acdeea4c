//! WebAssembly bindings for the CHIP-8 interpreter.
//!
//! This module provides JavaScript-friendly wrappers around the core machine.

use wasm_bindgen::prelude::*;
use crate::{Cpu, MachineConfig, Step};
use crate::rom::disassemble_instruction;
use crate::cpu::decode::encode;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    cpu: Cpu,
    program: Vec<u8>,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a new machine. Without a seed, one is drawn from `Math.random()`.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| (js_sys::Math::random() * u32::MAX as f64) as u64);
        Self {
            cpu: Cpu::with_config(&MachineConfig {
                seed: Some(seed),
                ..MachineConfig::default()
            }),
            program: Vec::new(),
        }
    }

    /// Reset the machine and load a program at 0x200.
    #[wasm_bindgen]
    pub fn load(&mut self, bytes: &[u8]) -> Result<usize, JsError> {
        self.cpu.reset();
        self.cpu.load_program(bytes)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        self.program = bytes.to_vec();
        Ok(bytes.len())
    }

    /// Step one instruction. Returns the disassembled instruction, or an
    /// empty string while waiting for a key.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        match self.cpu.step() {
            Ok(Step::Executed(instr)) => Ok(disassemble_instruction(encode(&instr))),
            Ok(Step::AwaitingKey) => Ok(String::new()),
            Err(e) => Err(JsError::new(&format!("{}", e))),
        }
    }

    /// Run up to `max_steps` steps. Returns the completed instruction count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> Result<u64, JsError> {
        self.cpu.run_limited(max_steps as u64)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(self.cpu.cycles)
    }

    /// Reset the machine and reload the last program.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        self.cpu.reset();
        self.cpu.load_program(&self.program)
            .map_err(|e| JsError::new(&format!("{}", e)))
    }

    /// Press or release a key (0-15).
    #[wasm_bindgen]
    pub fn set_key(&mut self, index: usize, pressed: bool) -> Result<(), JsError> {
        self.cpu.set_key(index, pressed)
            .map_err(|e| JsError::new(&format!("{}", e)))
    }

    /// Framebuffer pixels, row-major, one byte (0 or 1) per pixel.
    #[wasm_bindgen]
    pub fn graphics(&self) -> Vec<u8> {
        self.cpu.graphics().to_vec()
    }

    #[wasm_bindgen]
    pub fn width(&self) -> usize {
        self.cpu.width()
    }

    #[wasm_bindgen]
    pub fn height(&self) -> usize {
        self.cpu.height()
    }

    /// Check if the framebuffer changed since the last `clear_redraw`.
    #[wasm_bindgen]
    pub fn needs_redraw(&self) -> bool {
        self.cpu.needs_redraw()
    }

    #[wasm_bindgen]
    pub fn clear_redraw(&mut self) {
        self.cpu.clear_redraw();
    }

    /// Check if the machine is blocked waiting for a key.
    #[wasm_bindgen]
    pub fn is_awaiting_key(&self) -> bool {
        self.cpu.is_awaiting_key()
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Get registers, timers, stack and state as a JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.snapshot())
            .map_err(|e| JsError::new(&format!("{}", e)))
    }
}

/// Disassemble a single opcode word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: u16) -> String {
    disassemble_instruction(word)
}
