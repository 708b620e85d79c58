// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end
//!
//! Renders the live camera feed to the terminal using Unicode half-block
//! characters for improved vertical resolution, with a status bar showing the
//! upload counters. Acquisition errors pop up as a modal box that swallows
//! input until dismissed.

use crate::app::{AppCommand, SessionStatus};
use crate::backends::camera::CameraFrame;
use crate::constants::timing::TERMINAL_POLL;
use crate::errors::{AppError, AppResult};
use crate::session::{SessionState, UserNotifier};
use crate::surface::VideoSurface;
use crate::uploader::{UploadStats, UploadStatsSnapshot};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use std::collections::VecDeque;
use std::io::{self, stdout};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Pending alert messages, oldest first
#[derive(Debug, Clone, Default)]
pub struct AlertQueue {
    inner: Arc<Mutex<VecDeque<String>>>,
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, message: String) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(message);
    }

    fn front(&self) -> Option<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .front()
            .cloned()
    }

    fn dismiss(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
    }
}

/// Shows alerts as a modal box in the terminal UI
#[derive(Debug, Clone)]
pub struct TerminalNotifier {
    alerts: AlertQueue,
}

impl TerminalNotifier {
    pub fn new(alerts: AlertQueue) -> Self {
        Self { alerts }
    }
}

impl UserNotifier for TerminalNotifier {
    fn alert(&self, message: &str) {
        info!(message, "Showing alert");
        self.alerts.push(message.to_string());
    }
}

/// Everything the UI reads and the channel it writes commands to
pub struct TerminalUi {
    pub surface: VideoSurface,
    pub stats: Arc<UploadStats>,
    pub status: watch::Receiver<SessionStatus>,
    pub alerts: AlertQueue,
    pub commands: mpsc::UnboundedSender<AppCommand>,
    pub switch_enabled: bool,
    pub server_url: String,
}

/// Run the terminal UI on the calling thread until the user quits
///
/// Always sends [`AppCommand::Quit`] before returning, also on errors.
pub fn run(ui: TerminalUi) -> AppResult<()> {
    let terminal_error = |e: io::Error| AppError::Terminal(e.to_string());

    enable_raw_mode().map_err(terminal_error)?;
    let mut stdout = stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        let _ = ui.commands.send(AppCommand::Quit);
        return Err(terminal_error(e));
    }
    let backend = CrosstermBackend::new(stdout);
    let result = match Terminal::new(backend) {
        Ok(mut terminal) => {
            let result = run_app(&mut terminal, &ui);
            let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
            let _ = terminal.show_cursor();
            result
        }
        Err(e) => {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            Err(e)
        }
    };
    let _ = disable_raw_mode();
    let _ = ui.commands.send(AppCommand::Quit);

    result.map_err(terminal_error)
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ui: &TerminalUi,
) -> io::Result<()> {
    loop {
        let frame = ui.surface.current_frame();
        let status = ui.status.borrow().clone();
        let stats = ui.stats.snapshot();
        let alert = ui.alerts.front();

        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let camera_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };
            f.render_widget(
                FrameWidget {
                    frame: frame.as_deref(),
                    status: &status,
                },
                camera_area,
            );

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            let message = build_status_message(&status, &stats, &ui.server_url, ui.switch_enabled);
            f.render_widget(StatusBar { message: &message }, status_area);

            if let Some(alert) = &alert {
                let popup = centered(area, 60, 7);
                f.render_widget(Clear, popup);
                f.render_widget(
                    Paragraph::new(format!("{}\n\nPress any key to continue", alert))
                        .wrap(Wrap { trim: true })
                        .block(
                            Block::default()
                                .borders(Borders::ALL)
                                .title(" Camera ")
                                .style(Style::default().fg(Color::White).bg(Color::Red)),
                        ),
                    popup,
                );
            }
        })?;

        if !event::poll(TERMINAL_POLL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // The alert box swallows the key that dismisses it
        if alert.is_some() {
            ui.alerts.dismiss();
            continue;
        }

        let ctrl_c =
            key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl_c || key.code == KeyCode::Char('q') {
            break;
        }

        if key.code == KeyCode::Char('s') && ui.switch_enabled {
            debug!("Switch requested from terminal");
            if ui.commands.send(AppCommand::SwitchCamera).is_err() {
                // Controller is gone
                break;
            }
        }
    }

    Ok(())
}

fn build_status_message(
    status: &SessionStatus,
    stats: &UploadStatsSnapshot,
    server_url: &str,
    switch_enabled: bool,
) -> String {
    let camera = match (&status.state, &status.device) {
        (SessionState::Active(mode), Some(device)) => format!("{} ({})", mode, device),
        (SessionState::Active(mode), None) => mode.to_string(),
        (SessionState::Idle, _) => "no camera".to_string(),
    };
    let last = stats
        .last_delivery
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut msg = format!(
        "{} | {} sent, {} failed, last {} | {}",
        camera, stats.delivered, stats.failed, last, server_url
    );
    if switch_enabled {
        msg.push_str(" | 's' switch");
    }
    msg.push_str(" | 'q' quit");
    msg
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

/// Widget that renders a camera frame using half-block characters
struct FrameWidget<'a> {
    frame: Option<&'a CameraFrame>,
    status: &'a SessionStatus,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.filter(|f| f.has_pixels()) else {
            let msg = match self.status.state {
                SessionState::Idle => "No camera",
                SessionState::Active(_) => "Waiting for camera...",
            };
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };
        if area.width == 0 || area.height == 0 {
            return;
        }

        // Each terminal cell displays 2 vertical pixels using half-block characters
        let (cols, pixel_rows) = fit_aspect(
            frame.width,
            frame.height,
            u32::from(area.width),
            u32::from(area.height) * 2,
        );
        let rows = pixel_rows / 2;
        if cols == 0 || rows == 0 {
            return;
        }

        let x_offset = area.x + (area.width - cols as u16) / 2;
        let y_offset = area.y + (area.height - rows as u16) / 2;

        // Upper half (▀) colored with fg, lower half with bg
        for ty in 0..rows {
            for tx in 0..cols {
                let (r, g, b) = frame.sample_scaled(tx, ty * 2, cols, rows * 2);
                let top_color = Color::Rgb(r, g, b);
                let (r, g, b) = frame.sample_scaled(tx, ty * 2 + 1, cols, rows * 2);
                let bottom_color = Color::Rgb(r, g, b);

                if let Some(cell) = buf.cell_mut((x_offset + tx as u16, y_offset + ty as u16)) {
                    cell.set_char('▀');
                    cell.set_fg(top_color);
                    cell.set_bg(bottom_color);
                }
            }
        }
    }
}

/// Largest size with the frame's aspect ratio inside `max_width`x`max_height`
fn fit_aspect(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let scaled_height = u64::from(max_width) * u64::from(height) / u64::from(width);
    if scaled_height <= u64::from(max_height) {
        (max_width, scaled_height as u32)
    } else {
        let scaled_width = u64::from(max_height) * u64::from(width) / u64::from(height);
        (scaled_width as u32, max_height)
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}
