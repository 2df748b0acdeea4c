//! UI rendering for the player.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
    style::{Color, Style, Modifier},
};
use crate::cpu::{CpuState, Framebuffer};
use crate::rom::disassemble_instruction;
use super::app::PlayerApp;

/// Render the framebuffer as half-block text, two pixel rows per line.
pub fn render_framebuffer(fb: &Framebuffer) -> Vec<String> {
    let lit = |x: usize, y: usize| fb.get(x, y).unwrap_or(0) != 0;

    (0..fb.height())
        .step_by(2)
        .map(|y| {
            (0..fb.width())
                .map(|x| match (lit(x, y), lit(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect()
        })
        .collect()
}

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &PlayerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(app.cpu.width() as u16 + 2),
            Constraint::Min(30),
        ])
        .split(frame.area());

    // Left side: screen and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(app.screen.len() as u16 + 2),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(chunks[0]);

    draw_screen(frame, left_chunks[0], app);
    draw_status(frame, left_chunks[1], app);

    // Right side: machine state and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(14),
            Constraint::Length(7),
        ])
        .split(chunks[1]);

    draw_registers(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1]);
}

/// Draw the cached framebuffer rows.
fn draw_screen(frame: &mut Frame, area: Rect, app: &PlayerApp) {
    let lines: Vec<Line> = app.screen.iter().map(|row| Line::raw(row.as_str())).collect();

    let screen = Paragraph::new(lines)
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" CHIP-8 ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(screen, area);
}

/// Draw registers, timers and the next instruction.
fn draw_registers(frame: &mut Frame, area: Rect, app: &PlayerApp) {
    let regs = &app.cpu.regs;
    let next = disassemble_instruction(app.cpu.mem.read_word(regs.pc));

    let mut content = vec![
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{:#05X}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("   I: "),
            Span::styled(format!("{:#06X}", regs.i), Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::raw("Next: "),
            Span::styled(next, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        ]),
    ];

    for row in 0..4 {
        let spans: Vec<Span> = (0..4)
            .map(|col| row * 4 + col)
            .map(|r| {
                let style = if r == 0xF {
                    Style::default().fg(Color::Magenta)
                } else {
                    Style::default().fg(Color::White)
                };
                Span::styled(format!("V{:X}={:02X}  ", r, regs.v[r]), style)
            })
            .collect();
        content.push(Line::from(spans));
    }

    content.push(Line::from(vec![
        Span::raw("DT: "),
        Span::styled(format!("{:3}", regs.delay_timer), Style::default().fg(Color::Cyan)),
        Span::raw("   ST: "),
        Span::styled(format!("{:3}", regs.sound_timer), Style::default().fg(Color::Cyan)),
        Span::raw("   SP: "),
        Span::styled(format!("{}", regs.stack.depth()), Style::default().fg(Color::Cyan)),
    ]));
    content.push(Line::from(vec![
        Span::raw("Stack: "),
        Span::styled(format_stack(regs.stack.frames()), Style::default().fg(Color::White)),
    ]));
    content.push(Line::from(vec![
        Span::raw("Cycles: "),
        Span::styled(format!("{}", app.cpu.cycles), Style::default().fg(Color::Cyan)),
        Span::raw("   State: "),
        Span::styled(format!("{:?}", app.cpu.state), state_style(app.cpu.state)),
    ]));

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &PlayerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("Keypad: 1234 / qwer / asdf / zxcv"),
        Line::from("0: Step mode  n: Step  g: Fast-forward"),
        Line::from("=: Dump screen  Backspace: Reset"),
        Line::from("Esc: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Return addresses, innermost call last.
fn format_stack(frames: &[u16]) -> String {
    if frames.is_empty() {
        return "-".to_string();
    }
    frames
        .iter()
        .map(|addr| format!("{:#05X}", addr))
        .collect::<Vec<_>>()
        .join(" ")
}

fn state_style(state: CpuState) -> Style {
    match state {
        CpuState::Running => Style::default().fg(Color::Green),
        CpuState::AwaitingKey { .. } => Style::default().fg(Color::Yellow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_block_rendering() {
        let mut fb = Framebuffer::new(4, 4);
        // Column 0: rows 0 and 1; column 1: row 0; column 2: row 1.
        fb.draw_sprite(0, 0, &[0b1100_0000, 0b1010_0000]);

        let rows = render_framebuffer(&fb);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], "█▀▄ ");
        assert_eq!(rows[1], "    ");
    }

    #[test]
    fn test_stack_frames_listed_in_call_order() {
        assert_eq!(format_stack(&[]), "-");
        assert_eq!(format_stack(&[0x200, 0x30A]), "0x200 0x30A");
    }

    #[test]
    fn test_odd_height_renders_last_row() {
        let mut fb = Framebuffer::new(2, 3);
        fb.draw_sprite(0, 2, &[0b1000_0000]);

        let rows = render_framebuffer(&fb);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], "▀ ");
    }
}
