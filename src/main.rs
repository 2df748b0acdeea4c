//! CHIP-8 Emulator - CLI Entry Point
//!
//! Commands:
//! - `chip8-emu run <rom>` - Run a ROM headless and print the screen
//! - `chip8-emu play <rom>` - Play a ROM in the terminal
//! - `chip8-emu disasm <rom>` - Disassemble a ROM

use chip8::{Cpu, CpuError, MachineConfig, Step};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chip8-emu")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A CHIP-8 virtual machine interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a ROM headless for a number of steps
    Run {
        /// Path to the ROM file to execute
        rom: String,
        /// Maximum number of steps to run (default: 10000)
        #[arg(short, long, default_value = "10000")]
        max_cycles: u64,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// Seed for the random generator
        #[arg(long)]
        seed: Option<u64>,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<String>,
        /// Print registers, timers and stack as JSON when done
        #[arg(long)]
        dump_state: bool,
    },
    /// Play a ROM in the terminal
    Play {
        /// Path to the ROM file
        rom: String,
        /// Steps per second
        #[arg(long)]
        hz: Option<u32>,
        /// Seed for the random generator
        #[arg(long)]
        seed: Option<u64>,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Disassemble a ROM to readable text
    Disasm {
        /// Path to the ROM file
        rom: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run { rom, max_cycles, trace, seed, config, dump_state }) => {
            let config = load_config(config.as_deref(), seed, None);
            run_rom(&rom, max_cycles, trace, dump_state, &config);
        }
        Some(Commands::Play { rom, hz, seed, config }) => {
            let config = load_config(config.as_deref(), seed, hz);
            play_rom(&rom, config);
        }
        Some(Commands::Disasm { rom }) => {
            disassemble_file(&rom);
        }
        None => {
            println!("CHIP-8 Emulator v0.1.0");
            println!("A CHIP-8 virtual machine interpreter");
            println!();
            println!("Use --help for available commands");
        }
    }
}

/// Load the configuration file, if any, and apply command line overrides.
fn load_config(path: Option<&str>, seed: Option<u64>, hz: Option<u32>) -> MachineConfig {
    let loaded = match path {
        Some(path) => MachineConfig::load(path),
        None => Ok(MachineConfig::default()),
    };
    let mut config = match loaded {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if seed.is_some() {
        config.seed = seed;
    }
    if let Some(hz) = hz {
        config.hz = hz;
    }

    if let Err(e) = config.validate() {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
    config
}

fn read_rom(path: &str) -> Vec<u8> {
    match chip8::load_rom(path) {
        Ok(bytes) => {
            println!("📂 Loaded {} bytes", bytes.len());
            bytes
        }
        Err(e) => {
            eprintln!("❌ Failed to load ROM: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_rom(path: &str, max_cycles: u64, trace: bool, dump_state: bool, config: &MachineConfig) {
    use chip8::cpu::decode::encode;
    use chip8::disassemble_instruction;

    println!("🔧 Running: {}", path);

    let program = read_rom(path);

    // Create CPU and load program
    let mut cpu = Cpu::with_config(config);
    if let Err(e) = cpu.load_program(&program) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }

    println!();
    println!("━━━ Execution ━━━");

    // Run with optional trace
    let mut steps = 0u64;
    let mut reported_unknown = false;
    let mut stopped = false;
    while steps < max_cycles {
        let pc = cpu.regs.pc;
        steps += 1;

        match cpu.step() {
            Ok(Step::Executed(instr)) => {
                if trace {
                    let disasm = disassemble_instruction(encode(&instr));
                    println!("{:#05X}: {:<18} I={:#05X} VF={:02X} DT={}",
                        pc, disasm, cpu.regs.i, cpu.regs.v[0xF], cpu.regs.delay_timer);
                }
            }
            Ok(Step::AwaitingKey) => {
                println!("⏸  Waiting for a key at {:#05X}; no input in headless mode", pc);
                stopped = true;
                break;
            }
            Err(e @ CpuError::UnknownOpcode { .. }) => {
                if config.halt_on_unknown {
                    eprintln!("❌ {}", e);
                    stopped = true;
                    break;
                }
                if !reported_unknown {
                    eprintln!("⚠️  {} (the machine will not advance past it)", e);
                    reported_unknown = true;
                }
            }
            Err(e) => {
                eprintln!("❌ CPU error at PC={:#05X}: {}", pc, e);
                std::process::exit(1);
            }
        }
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Cycles: {}", cpu.cycles);
    println!("State:  {:?}", cpu.state);
    println!("PC: {:#05X}  I: {:#06X}  SP: {}", cpu.regs.pc, cpu.regs.i, cpu.regs.stack.depth());
    println!("DT: {}  ST: {}", cpu.regs.delay_timer, cpu.regs.sound_timer);
    for (row, regs) in cpu.regs.v.chunks(8).enumerate() {
        let line: Vec<String> = regs
            .iter()
            .enumerate()
            .map(|(col, v)| format!("V{:X}={:02X}", row * 8 + col, v))
            .collect();
        println!("{}", line.join(" "));
    }

    println!();
    println!("━━━ Screen ━━━");
    print!("{}", cpu.framebuffer().to_ascii());

    if dump_state {
        println!();
        match serde_json::to_string_pretty(&cpu.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("❌ Failed to serialize state: {}", e);
                std::process::exit(1);
            }
        }
    }

    if !stopped {
        println!();
        println!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
    }
}

#[cfg(feature = "tui")]
fn play_rom(path: &str, config: MachineConfig) {
    println!("🎮 Loading: {}", path);

    let program = read_rom(path);

    if let Err(e) = chip8::run_player(program, config) {
        eprintln!("❌ Player error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn play_rom(_path: &str, _config: MachineConfig) {
    eprintln!("❌ This build has no terminal player; rebuild with --features tui");
    std::process::exit(1);
}

fn disassemble_file(path: &str) {
    use chip8::disassemble;

    println!("📖 Disassembling: {}", path);
    println!();

    let program = read_rom(path);

    let output = disassemble(&program);
    println!("{}", output);
}
