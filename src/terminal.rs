// SPDX-License-Identifier: GPL-3.0-only

//! Terminal scanner screen
//!
//! Renders the scanner screen with ratatui. Camera frames and picked images
//! are drawn with Unicode half-block characters for improved vertical
//! resolution.

use crate::backends::camera::types::{CameraFrame, PixelFormat};
use crate::backends::system_collaborators;
use crate::config::Config;
use crate::constants::{labels, timing};
use crate::scanner::{Phase, ScannerScreen, SourceChoice};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Widget, Wrap},
};
use std::io::{self, stdout};
use tracing::{info, warn};

/// Run the scanner screen until the user quits
pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    let mut screen = ScannerScreen::new(system_collaborators(runtime.handle().clone(), config));

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut screen, config.mirror_preview);

    screen.exit();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

enum KeyAction {
    Continue,
    Notify(String),
    Quit,
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    screen: &mut ScannerScreen,
    mirror_preview: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut notice: Option<String> = None;

    loop {
        screen.pump();

        terminal.draw(|f| draw(f, screen, notice.as_deref(), mirror_preview))?;

        if event::poll(timing::UI_POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match handle_key(screen, key) {
                KeyAction::Continue => notice = None,
                KeyAction::Notify(message) => notice = Some(message),
                KeyAction::Quit => break,
            }
        }
    }

    info!("Leaving scanner screen");
    Ok(())
}

fn handle_key(screen: &mut ScannerScreen, key: KeyEvent) -> KeyAction {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyAction::Quit;
    }

    match screen.phase() {
        Phase::ChoosingSource => match key.code {
            KeyCode::Char('g') => screen.choose_source(SourceChoice::Gallery),
            KeyCode::Char('c') => screen.choose_source(SourceChoice::Camera),
            KeyCode::Esc => screen.choose_source(SourceChoice::Cancel),
            KeyCode::Up | KeyCode::Char('k') => screen.selector_mut().highlight_previous(),
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                screen.selector_mut().highlight_next()
            }
            KeyCode::Enter => {
                let choice = screen.selector().highlighted();
                screen.choose_source(choice);
            }
            _ => {}
        },
        Phase::DenialNotice => match key.code {
            KeyCode::Char('s') => screen.dismiss_notice(true),
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('o') => screen.dismiss_notice(false),
            _ => {}
        },
        _ => match key.code {
            KeyCode::Char('q') => return KeyAction::Quit,
            KeyCode::Enter | KeyCode::Char('d') => screen.detect_barcode_pressed(),
            KeyCode::Char('o') => {
                if let Err(e) = screen.open_payload() {
                    warn!(error = %e, "Cannot open payload");
                    return KeyAction::Notify(e.to_string());
                }
            }
            _ => {}
        },
    }
    KeyAction::Continue
}

fn draw(f: &mut Frame, screen: &ScannerScreen, notice: Option<&str>, mirror_preview: bool) {
    let [header, body, status, button, hints] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(f.area());

    f.render_widget(
        Paragraph::new(labels::SCREEN_TITLE)
            .alignment(Alignment::Center)
            .style(Style::default().add_modifier(Modifier::BOLD)),
        header,
    );

    let view = screen.view();
    if view.camera_visible {
        let block = Block::bordered().title(" Camera ");
        let inner = block.inner(body);
        f.render_widget(block, body);
        f.render_widget(
            FrameWidget {
                frame: view.camera_frame.as_ref(),
                placeholder: "Waiting for camera...",
                mirror: mirror_preview,
            },
            inner,
        );
    } else if view.image_visible {
        let block = Block::bordered().title(" Image ");
        let inner = block.inner(body);
        f.render_widget(block, body);
        f.render_widget(
            FrameWidget {
                frame: view.image_frame.as_ref(),
                placeholder: "Loading image...",
                mirror: false,
            },
            inner,
        );
    }

    let status_style = match screen.presenter().current() {
        Some(crate::scanner::DetectionResult::Failure(_)) => Style::default().fg(Color::Red),
        _ => Style::default(),
    };
    f.render_widget(
        Paragraph::new(screen.status_line())
            .alignment(Alignment::Center)
            .style(status_style),
        status,
    );

    let button_style = if screen.phase() == Phase::Idle || screen.phase() == Phase::Scanning {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    f.render_widget(
        Paragraph::new(Span::styled(format!("[ {} ]", labels::DETECT_BUTTON), button_style))
            .alignment(Alignment::Center),
        button,
    );

    let hint_text = notice.map(str::to_string).unwrap_or_else(|| key_hints(screen.phase()));
    f.render_widget(StatusBar { message: &hint_text }, hints);

    match screen.phase() {
        Phase::ChoosingSource => draw_source_selector(f, screen),
        Phase::DenialNotice => draw_denial_notice(f),
        _ => {}
    }
}

fn key_hints(phase: Phase) -> String {
    match phase {
        Phase::ChoosingSource => "g gallery | c camera | Esc cancel | ↑/↓ Enter select".to_string(),
        Phase::DenialNotice => "s settings | Enter okay".to_string(),
        Phase::AwaitingPermission => "Waiting for camera permission...".to_string(),
        Phase::PickingImage => "Choose an image in the file dialog".to_string(),
        Phase::DetectingImage => "Detecting...".to_string(),
        Phase::StartingCamera => "Starting camera...".to_string(),
        Phase::Scanning => "Point the camera at a barcode | d restart | q quit".to_string(),
        Phase::Idle => "Enter/d detect | o open result | q quit".to_string(),
    }
}

fn draw_source_selector(f: &mut Frame, screen: &ScannerScreen) {
    let selector = screen.selector();
    let mut lines = vec![Line::from(selector.message()), Line::from("")];
    for choice in selector.choices() {
        let style = if *choice == selector.highlighted() {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!(" {} ({}) ", choice.label(), choice.key_hint()),
            style,
        )));
    }

    let area = centered(f.area(), 34, lines.len() as u16 + 2);
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(format!(" {} ", selector.title()))),
        area,
    );
}

fn draw_denial_notice(f: &mut Frame) {
    let lines = vec![
        Line::from(labels::DENIED_MESSAGE),
        Line::from(""),
        Line::from(format!("{} (s)    {} (Enter)", labels::SETTINGS, labels::OKAY)),
    ];

    let area = centered(f.area(), 48, 7);
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::bordered().title(format!(" {} ", labels::DENIED_TITLE))),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Renders a frame using half-block characters: two pixels per cell
struct FrameWidget<'a> {
    frame: Option<&'a CameraFrame>,
    placeholder: &'a str,
    mirror: bool,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.filter(|f| f.width > 0 && f.height > 0) else {
            let x = area.x + (area.width.saturating_sub(self.placeholder.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, self.placeholder, Style::default());
            }
            return;
        };
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Each cell displays 2 vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            ((w as u16).max(1), ((h / 2.0) as u16).max(1))
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            ((w as u16).max(1), ((h / 2.0) as u16).max(1))
        };

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;
                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let mut src_x = ((tx as f64 * x_scale) as u32).min(frame.width - 1);
                if self.mirror {
                    src_x = frame.width - 1 - src_x;
                }
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(frame, src_x, src_y_top));
                    cell.set_bg(sample_pixel(frame, src_x, src_y_bottom));
                }
            }
        }
    }
}

fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let (r, g, b) = sample_pixel_rgb(frame, x, y);
    Color::Rgb(r, g, b)
}

fn sample_pixel_rgb(frame: &CameraFrame, x: u32, y: u32) -> (u8, u8, u8) {
    let x = x.min(frame.width - 1) as usize;
    let y = y.min(frame.height - 1) as usize;
    let stride = frame.stride as usize;
    let data = frame.data_slice();

    match frame.format {
        PixelFormat::RGBA | PixelFormat::RGB24 => {
            let bpp = frame.format.bytes_per_pixel() as usize;
            let idx = y * stride + x * bpp;
            match data.get(idx..idx + 3) {
                Some(p) => (p[0], p[1], p[2]),
                None => (0, 0, 0),
            }
        }
        PixelFormat::Gray8 => {
            let v = data.get(y * stride + x).copied().unwrap_or(0);
            (v, v, v)
        }
    }
}

/// Single-line key hint bar
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().bg(Color::DarkGray).fg(Color::White);
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_style(style);
            }
        }
        let x = area.x + (area.width.saturating_sub(self.message.chars().count() as u16)) / 2;
        buf.set_string(x, area.y, self.message, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn two_by_two() -> CameraFrame {
        // red, green / blue, white
        let data: Vec<u8> = vec![
            255, 0, 0, 255, 0, 255, 0, 255, //
            0, 0, 255, 255, 255, 255, 255, 255,
        ];
        CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(data.as_slice()),
            format: PixelFormat::RGBA,
            stride: 8,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_half_blocks_carry_two_rows() {
        let frame = two_by_two();
        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        FrameWidget {
            frame: Some(&frame),
            placeholder: "",
            mirror: false,
        }
        .render(area, &mut buf);

        let left = buf.cell((0, 0)).unwrap();
        assert_eq!(left.symbol(), "▀");
        assert_eq!(left.fg, Color::Rgb(255, 0, 0));
        assert_eq!(left.bg, Color::Rgb(0, 0, 255));
        let right = buf.cell((1, 0)).unwrap();
        assert_eq!(right.fg, Color::Rgb(0, 255, 0));
        assert_eq!(right.bg, Color::Rgb(255, 255, 255));
    }

    #[test]
    fn test_mirror_flips_columns() {
        let frame = two_by_two();
        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        FrameWidget {
            frame: Some(&frame),
            placeholder: "",
            mirror: true,
        }
        .render(area, &mut buf);

        assert_eq!(buf.cell((0, 0)).unwrap().fg, Color::Rgb(0, 255, 0));
    }

    #[test]
    fn test_placeholder_without_frame() {
        let area = Rect::new(0, 0, 20, 3);
        let mut buf = Buffer::empty(area);
        FrameWidget {
            frame: None,
            placeholder: "Loading",
            mirror: false,
        }
        .render(area, &mut buf);

        let row: String = (0..20).map(|x| buf.cell((x, 1)).unwrap().symbol()).collect();
        assert_eq!(row.trim(), "Loading");
    }

    #[test]
    fn test_centered_clamps_to_area() {
        let area = Rect::new(0, 0, 10, 4);
        assert_eq!(centered(area, 40, 10), area);
        assert_eq!(centered(area, 4, 2), Rect::new(3, 1, 4, 2));
    }
}
