//! Player application state and host loop.

use crate::config::MachineConfig;
use crate::cpu::keypad::KEY_COUNT;
use crate::cpu::{Cpu, CpuError, LoadError, Step};
use crate::rom::disassemble_instruction;
use log::debug;
use std::time::{Duration, Instant};

/// How long a key stays held after a terminal key press.
///
/// Terminals report presses (and auto-repeat) but usually not releases.
pub const KEY_LATCH: Duration = Duration::from_millis(150);

/// Map a host keyboard character to a keypad key.
///
/// ```text
/// Keypad       Keyboard
/// 1 2 3 C      1 2 3 4
/// 4 5 6 D      q w e r
/// 7 8 9 E      a s d f
/// A 0 B F      z x c v
/// ```
pub fn map_key(c: char) -> Option<u8> {
    let key = match c.to_ascii_lowercase() {
        '1' => 0x1,
        '2' => 0x2,
        '3' => 0x3,
        '4' => 0xC,
        'q' => 0x4,
        'w' => 0x5,
        'e' => 0x6,
        'r' => 0xD,
        'a' => 0x7,
        's' => 0x8,
        'd' => 0x9,
        'f' => 0xE,
        'z' => 0xA,
        'x' => 0x0,
        'c' => 0xB,
        'v' => 0xF,
        _ => return None,
    };
    Some(key)
}

/// Player application state.
pub struct PlayerApp {
    /// The machine being run.
    pub cpu: Cpu,
    /// Program image, kept for reset.
    pub program: Vec<u8>,
    /// Host configuration.
    pub config: MachineConfig,
    /// Single-step mode: only step on request.
    pub step_mode: bool,
    /// Fast-forward: step on every loop iteration.
    pub fast_forward: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Rendered framebuffer rows, refreshed only when the machine redraws.
    pub screen: Vec<String>,
    /// Framebuffer text art captured with `=`, printed after the terminal
    /// is restored.
    pub dumps: Vec<String>,
    key_latch: [Option<Instant>; KEY_COUNT],
    last_step: Instant,
}

impl PlayerApp {
    /// Create a player with a loaded program.
    pub fn new(program: Vec<u8>, config: MachineConfig) -> Result<Self, LoadError> {
        let mut cpu = Cpu::with_config(&config);
        cpu.load_program(&program)?;

        let mut app = Self {
            cpu,
            program,
            config,
            step_mode: false,
            fast_forward: false,
            should_quit: false,
            status: "Running. Press '0' for step mode, 'g' to fast-forward, Esc to quit.".into(),
            screen: Vec::new(),
            dumps: Vec::new(),
            key_latch: [None; KEY_COUNT],
            last_step: Instant::now(),
        };
        app.refresh_screen();
        Ok(app)
    }

    /// Interval between steps in real-time mode.
    pub fn step_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.hz.max(1) as f64)
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        let pc = self.cpu.regs.pc;
        match self.cpu.step() {
            Ok(Step::Executed(_)) => {
                if self.step_mode {
                    let word = self.cpu.mem.read_word(pc);
                    self.status = format!("{:#05X}: {}", pc, disassemble_instruction(word));
                }
            }
            Ok(Step::AwaitingKey) => {
                self.status = format!("{:#05X}: waiting for a key", pc);
            }
            Err(e) => self.on_error(e),
        }
        self.refresh_screen();
    }

    fn on_error(&mut self, e: CpuError) {
        self.status = format!("Error: {}", e);
        let fatal = match e {
            CpuError::UnknownOpcode { .. } => self.config.halt_on_unknown,
            _ => true,
        };
        if fatal {
            self.step_mode = true;
            self.fast_forward = false;
        }
    }

    /// Run one iteration of the host loop.
    pub fn tick(&mut self, now: Instant) {
        self.release_expired_keys(now);

        if self.fast_forward {
            self.step();
            self.last_step = now;
        } else if !self.step_mode && now.duration_since(self.last_step) >= self.step_period() {
            self.step();
            self.last_step = now;
        }
    }

    /// Rebuild the rendered framebuffer if the machine drew since last time.
    pub fn refresh_screen(&mut self) {
        if !self.cpu.needs_redraw() {
            return;
        }
        self.screen = super::ui::render_framebuffer(self.cpu.framebuffer());
        self.cpu.clear_redraw();
    }

    /// Hold a keypad key for the latch window.
    pub fn press_key(&mut self, key: u8, now: Instant) {
        let key = (key & 0xF) as usize;
        self.key_latch[key] = Some(now + KEY_LATCH);
        let _ = self.cpu.set_key(key, true);
    }

    fn release_expired_keys(&mut self, now: Instant) {
        for key in 0..KEY_COUNT {
            if let Some(until) = self.key_latch[key] {
                if now >= until {
                    self.key_latch[key] = None;
                    let _ = self.cpu.set_key(key, false);
                }
            }
        }
    }

    /// Toggle single-step mode.
    pub fn toggle_step_mode(&mut self) {
        self.step_mode = !self.step_mode;
        self.status = if self.step_mode {
            "Step mode. Press 'n' to step.".into()
        } else {
            "Running.".into()
        };
    }

    /// Toggle fast-forward.
    pub fn toggle_fast_forward(&mut self) {
        self.fast_forward = !self.fast_forward;
        self.status = if self.fast_forward {
            "Fast-forward.".into()
        } else {
            "Running.".into()
        };
    }

    /// Capture the framebuffer as text art.
    pub fn dump_screen(&mut self) {
        let pc = self.cpu.regs.pc;
        debug!("captured framebuffer at {:#05X}", pc);
        self.dumps.push(format!("; framebuffer at {:#05X}\n{}", pc, self.cpu.framebuffer().to_ascii()));
        self.status = format!("Framebuffer captured ({}); printed on exit.", self.dumps.len());
    }

    /// Reset the machine and reload the program.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.key_latch = [None; KEY_COUNT];
        match self.cpu.load_program(&self.program) {
            Ok(()) => self.status = "Reset.".into(),
            Err(e) => self.status = format!("Reload failed: {}", e),
        }
        self.refresh_screen();
    }
}

/// Run the player with a program until the user quits.
pub fn run_player(program: Vec<u8>, config: MachineConfig) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;

    let mut app = PlayerApp::new(program, config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        // Handle input
        let now = Instant::now();
        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Release {
                    match key.code {
                        KeyCode::Esc => app.should_quit = true,
                        KeyCode::Backspace => app.reset(),
                        KeyCode::Char('0') => app.toggle_step_mode(),
                        KeyCode::Char('n') if app.step_mode => app.step(),
                        KeyCode::Char('g') => app.toggle_fast_forward(),
                        KeyCode::Char('=') => app.dump_screen(),
                        KeyCode::Char(c) => {
                            if let Some(k) = map_key(c) {
                                app.press_key(k, now);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        app.tick(now);

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    for dump in &app.dumps {
        println!("{}", dump);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0x200: LD V0, K ; 0x202: JP 0x202
    const WAIT_THEN_SPIN: [u8; 4] = [0xF0, 0x0A, 0x12, 0x02];

    fn app() -> PlayerApp {
        let config = MachineConfig {
            seed: Some(3),
            ..MachineConfig::default()
        };
        PlayerApp::new(WAIT_THEN_SPIN.to_vec(), config).unwrap()
    }

    #[test]
    fn test_keymap() {
        assert_eq!(map_key('1'), Some(0x1));
        assert_eq!(map_key('4'), Some(0xC));
        assert_eq!(map_key('X'), Some(0x0));
        assert_eq!(map_key('v'), Some(0xF));
        assert_eq!(map_key('p'), None);
    }

    #[test]
    fn test_new_renders_first_frame() {
        let app = app();
        assert_eq!(app.screen.len(), 16);
        assert!(!app.cpu.needs_redraw());
    }

    #[test]
    fn test_oversize_program_rejected() {
        let result = PlayerApp::new(vec![0; 4000], MachineConfig::default());
        assert!(matches!(result, Err(LoadError::OversizeProgram { .. })));
    }

    #[test]
    fn test_key_press_unblocks_wait_and_expires() {
        let mut app = app();
        app.step_mode = true;
        let t0 = Instant::now();

        app.step();
        assert!(app.cpu.is_awaiting_key());

        app.press_key(0x5, t0);
        app.step();
        assert_eq!(app.cpu.regs.v[0], 0x5);
        assert_eq!(app.cpu.regs.pc, 0x202);

        app.tick(t0 + KEY_LATCH);
        assert!(!app.cpu.is_key_pressed(0x5));
    }

    #[test]
    fn test_step_mode_does_not_advance_on_tick() {
        let mut app = app();
        app.toggle_step_mode();
        app.tick(Instant::now() + Duration::from_secs(1));
        assert_eq!(app.cpu.cycles, 0);
    }

    #[test]
    fn test_unknown_opcode_pauses_when_configured() {
        let config = MachineConfig {
            halt_on_unknown: true,
            ..MachineConfig::default()
        };
        let mut app = PlayerApp::new(vec![0xFF, 0xFF], config).unwrap();
        app.fast_forward = true;

        app.tick(Instant::now());

        assert!(app.step_mode);
        assert!(!app.fast_forward);
        assert!(app.status.contains("unknown opcode"));
    }

    #[test]
    fn test_dump_screen_captures_art() {
        let mut app = app();
        app.dump_screen();
        app.dump_screen();

        assert_eq!(app.dumps.len(), 2);
        assert!(app.dumps[0].starts_with("; framebuffer at 0x200\n"));
        assert!(app.dumps[0].ends_with(&app.cpu.framebuffer().to_ascii()));
        assert!(app.status.contains("(2)"));
    }

    #[test]
    fn test_reset_reloads_program() {
        let mut app = app();
        app.press_key(1, Instant::now());
        app.step();
        app.step();

        app.reset();

        assert_eq!(app.cpu.regs.pc, 0x200);
        assert_eq!(app.cpu.mem.slice(0x200, 4), &WAIT_THEN_SPIN);
        assert!(!app.cpu.is_key_pressed(1));
    }
}
