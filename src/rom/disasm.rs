//! Disassembler for CHIP-8 programs.
//!
//! Converts opcode words back to readable assembly using the conventional
//! mnemonics (`CLS`, `LD Vx, byte`, `DRW Vx, Vy, n`, ...).

use crate::cpu::decode::{decode, Instruction};
use crate::cpu::memory::PROGRAM_START;

/// Disassemble a single opcode word to text.
pub fn disassemble_instruction(word: u16) -> String {
    match decode(word) {
        Ok(decoded) => format_instruction(&decoded),
        Err(_) => format!("??? ; {:#06X}", word),
    }
}

/// Disassemble a program image as loaded at 0x200.
pub fn disassemble(program: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; CHIP-8 Disassembly\n");
    output.push_str("; ------------------\n\n");

    for (n, chunk) in program.chunks(2).enumerate() {
        let addr = PROGRAM_START as usize + n * 2;
        match *chunk {
            [hi, lo] => {
                let word = u16::from_be_bytes([hi, lo]);
                let line = disassemble_instruction(word);
                output.push_str(&format!("{:#05X}: {:04X}  {}\n", addr, word, line));
            }
            [byte] => output.push_str(&format!("{:#05X}: {:02X}    DB {:#04X}\n", addr, byte, byte)),
            _ => unreachable!("chunks(2) yields one or two bytes"),
        }
    }

    output
}

/// Format a decoded instruction as assembly text.
fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        // Flow control
        Instruction::ClearScreen => "CLS".to_string(),
        Instruction::Return => "RET".to_string(),
        Instruction::Jump { addr } => format!("JP {}", addr_operand(addr)),
        Instruction::Call { addr } => format!("CALL {}", addr_operand(addr)),
        Instruction::JumpOffset { addr } => format!("JP V0, {}", addr_operand(addr)),

        // Skips
        Instruction::SkipEqByte { x, byte } => format!("SE V{:X}, {:#04X}", x, byte),
        Instruction::SkipNeByte { x, byte } => format!("SNE V{:X}, {:#04X}", x, byte),
        Instruction::SkipEqReg { x, y } => format!("SE V{:X}, V{:X}", x, y),
        Instruction::SkipNeReg { x, y } => format!("SNE V{:X}, V{:X}", x, y),
        Instruction::SkipKeyPressed { x } => format!("SKP V{:X}", x),
        Instruction::SkipKeyReleased { x } => format!("SKNP V{:X}", x),

        // Arithmetic
        Instruction::LoadByte { x, byte } => format!("LD V{:X}, {:#04X}", x, byte),
        Instruction::AddByte { x, byte } => format!("ADD V{:X}, {:#04X}", x, byte),
        Instruction::Move { x, y } => format!("LD V{:X}, V{:X}", x, y),
        Instruction::Or { x, y } => format!("OR V{:X}, V{:X}", x, y),
        Instruction::And { x, y } => format!("AND V{:X}, V{:X}", x, y),
        Instruction::Xor { x, y } => format!("XOR V{:X}, V{:X}", x, y),
        Instruction::AddReg { x, y } => format!("ADD V{:X}, V{:X}", x, y),
        Instruction::SubReg { x, y } => format!("SUB V{:X}, V{:X}", x, y),
        Instruction::ShiftRight { x, y } => format!("SHR V{:X}, V{:X}", x, y),
        Instruction::SubNeg { x, y } => format!("SUBN V{:X}, V{:X}", x, y),
        Instruction::ShiftLeft { x, y } => format!("SHL V{:X}, V{:X}", x, y),
        Instruction::Random { x, byte } => format!("RND V{:X}, {:#04X}", x, byte),

        // Index, timers, memory
        Instruction::LoadIndex { addr } => format!("LD I, {}", addr_operand(addr)),
        Instruction::AddIndex { x } => format!("ADD I, V{:X}", x),
        Instruction::LoadFont { x } => format!("LD F, V{:X}", x),
        Instruction::StoreBcd { x } => format!("LD B, V{:X}", x),
        Instruction::StoreRegisters { x } => format!("LD [I], V{:X}", x),
        Instruction::LoadRegisters { x } => format!("LD V{:X}, [I]", x),
        Instruction::LoadDelay { x } => format!("LD V{:X}, DT", x),
        Instruction::SetDelay { x } => format!("LD DT, V{:X}", x),
        Instruction::SetSound { x } => format!("LD ST, V{:X}", x),

        // Display & input
        Instruction::Draw { x, y, rows } => format!("DRW V{:X}, V{:X}, {}", x, y, rows),
        Instruction::WaitKey { x } => format!("LD V{:X}, K", x),

        // Extended dialect
        Instruction::ScrollDown { rows } => format!("SCD {}", rows),
        Instruction::ScrollRight => "SCR".to_string(),
        Instruction::ScrollLeft => "SCL".to_string(),
        Instruction::Exit => "EXIT".to_string(),
        Instruction::LowRes => "LOW".to_string(),
        Instruction::HighRes => "HIGH".to_string(),
        Instruction::LoadLargeFont { x } => format!("LD HF, V{:X}", x),
        Instruction::SaveFlags { x } => format!("LD R, V{:X}", x),
        Instruction::LoadFlags { x } => format!("LD V{:X}, R", x),
    }
}

/// Format a 12-bit address operand.
fn addr_operand(addr: u16) -> String {
    format!("{:#05X}", addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;

    #[test]
    fn test_disassemble_cls() {
        assert_eq!(disassemble_instruction(0x00E0), "CLS");
    }

    #[test]
    fn test_disassemble_operands() {
        assert_eq!(disassemble_instruction(0x12A0), "JP 0x2A0");
        assert_eq!(disassemble_instruction(0x631F), "LD V3, 0x1F");
        assert_eq!(disassemble_instruction(0xD015), "DRW V0, V1, 5");
        assert_eq!(disassemble_instruction(0xFA65), "LD VA, [I]");
        assert_eq!(disassemble_instruction(0xB300), "JP V0, 0x300");
    }

    #[test]
    fn test_disassemble_unknown() {
        let result = disassemble_instruction(0xF1FF);
        assert!(result.starts_with("???"));
        assert!(result.contains("0xF1FF"));
    }

    #[test]
    fn test_disassemble_program_listing() {
        let program = [0x00, 0xE0, 0x12, 0x00, 0xAB];
        let listing = disassemble(&program);

        assert!(listing.contains("0x200: 00E0  CLS"));
        assert!(listing.contains("0x202: 1200  JP 0x200"));
        assert!(listing.contains("0x204: AB    DB 0xAB"));
    }

    #[test]
    fn test_every_instruction_has_a_mnemonic() {
        for word in [0x00FB_u16, 0x00C3, 0x8126, 0xE2A1, 0xF429, 0xF085] {
            let instr = decode(word).unwrap();
            let text = disassemble_instruction(encode(&instr));
            assert!(!text.starts_with("???"), "{:04X} -> {}", word, text);
        }
    }
}
