// SPDX-License-Identifier: GPL-3.0-only

//! Terminal front end
//!
//! Draws the three tabs with ratatui and renders the camera preview using
//! Unicode half-block characters for improved vertical resolution. Lookups
//! run on a tokio runtime and report back over a channel that the draw loop
//! drains every tick.

use crate::app::{ActionHint, App, Effect, Line, Message, Tab, View};
use crate::backends::camera::{CameraFrame, CameraManager, get_backend};
use crate::config::{AppTheme, Config, PreferenceStore, Preferences};
use crate::constants::{UI_TICK, app_info, language_name};
use crate::errors::AppResult;
use crate::lookup::LookupClient;
use crate::scanner::SessionEvent;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use image::RgbImage;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line as TextLine, Span, Text},
    widgets::{Block, Paragraph, Tabs, Widget, Wrap},
};
use std::io::{self, stdout};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

/// Run the interactive terminal interface
pub fn run(config: Config) -> AppResult<()> {
    let client = LookupClient::new(&config.api_base_url, config.request_timeout)?;
    let runtime = tokio::runtime::Runtime::new()?;

    let store = match PreferenceStore::default_location() {
        Ok(store) => Some(store),
        Err(e) => {
            info!(error = %e, "Preferences will not be saved");
            None
        }
    };
    let prefs = store.as_ref().map(|s| s.load()).unwrap_or_else(Preferences::default);

    let camera = CameraManager::new(get_backend());
    let (app, session_rx) = App::new(config, prefs, store, camera);

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut ui = Ui {
        app,
        session_rx,
        runtime: runtime.handle().clone(),
        client,
        preview: PreviewWidget::default(),
        selected_quake: 0,
        scroll: 0,
    };
    let result = ui.run(&mut terminal);
    drop(ui);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

struct Ui {
    app: App,
    session_rx: UnboundedReceiver<SessionEvent>,
    runtime: tokio::runtime::Handle,
    client: LookupClient,
    preview: PreviewWidget,
    /// Earthquake entry under the cursor
    selected_quake: usize,
    scroll: u16,
}

impl Ui {
    fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> AppResult<()> {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let effects = self.app.start();
        self.dispatch(effects, &done_tx);

        loop {
            // Drain completions before drawing
            while let Ok(event) = self.session_rx.try_recv() {
                let effects = self.app.update(Message::Session(event));
                self.dispatch(effects, &done_tx);
            }
            while let Ok(message) = done_rx.try_recv() {
                let effects = self.app.update(message);
                self.dispatch(effects, &done_tx);
            }

            match self.app.preview_frame() {
                Some(frame) => self.preview.update(&frame),
                None => self.preview.clear(),
            }

            let today = chrono::Local::now().date_naive();
            let view = self.app.view(today);
            terminal.draw(|f| self.draw(f, &view))?;

            // Handle input with timeout for frame updates
            if event::poll(UI_TICK)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                let Some(message) = self.handle_key(key, &view) else {
                    if is_quit(key) {
                        break;
                    }
                    continue;
                };
                let effects = self.app.update(message);
                self.dispatch(effects, &done_tx);
            }
        }

        info!("Terminal interface closed");
        Ok(())
    }

    fn dispatch(&self, effects: Vec<Effect>, done: &UnboundedSender<Message>) {
        for effect in effects {
            effect.spawn(&self.runtime, &self.client, done.clone());
        }
    }

    /// Map a key press to a message; `None` for keys handled locally
    fn handle_key(&mut self, key: KeyEvent, view: &View) -> Option<Message> {
        let tab = self.app.active_tab();
        let message = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return None,
            KeyCode::Char('q') => return None,
            KeyCode::Tab => Message::NextTab,
            KeyCode::Char('1') => Message::SelectTab(Tab::Barcode),
            KeyCode::Char('2') => Message::SelectTab(Tab::Ingredients),
            KeyCode::Char('3') => Message::SelectTab(Tab::Earthquake),
            KeyCode::Enter | KeyCode::Char(' ') => match view.action {
                Some(ActionHint::TryAgain | ActionHint::AnalyzeAgain) => Message::Retry,
                Some(_) => Message::StartScan,
                None if tab == Tab::Ingredients && self.app.is_scanning(tab) => Message::Capture,
                None => return None,
            },
            KeyCode::Char('r') => Message::Retry,
            KeyCode::Char('f') => Message::Refresh,
            KeyCode::Esc => Message::CancelScan,
            KeyCode::Char('l') => Message::NextLanguage,
            KeyCode::Char('t') => Message::ToggleTheme,
            KeyCode::Char('c') => Message::NextCamera,
            KeyCode::Char('d') => Message::RefreshCameras,
            KeyCode::Up if tab == Tab::Earthquake => {
                self.selected_quake = self.selected_quake.saturating_sub(1);
                return None;
            }
            KeyCode::Down if tab == Tab::Earthquake => {
                self.selected_quake += 1;
                return None;
            }
            KeyCode::Right | KeyCode::Left if tab == Tab::Earthquake => {
                Message::ToggleQuake(self.selected_quake)
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(5);
                return None;
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(5);
                return None;
            }
            _ => return None,
        };

        if matches!(message, Message::NextTab | Message::SelectTab(_)) {
            self.scroll = 0;
            self.selected_quake = 0;
        }
        debug!(?message, "Key mapped");
        Some(message)
    }

    fn draw(&self, f: &mut Frame, view: &View) {
        let palette = Palette::for_theme(self.app.theme());
        let area = f.area();
        f.render_widget(Block::default().style(palette.base()), area);

        let [tabs_area, status_area, main_area, help_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(area);

        let titles: Vec<&str> = Tab::ALL.iter().map(|t| t.title()).collect();
        let tabs = Tabs::new(titles)
            .select(self.app.active_tab().index())
            .style(palette.dim())
            .highlight_style(palette.accent().add_modifier(Modifier::BOLD));
        f.render_widget(tabs, tabs_area);

        let status = Text::from(vec![
            TextLine::from(vec![
                Span::styled("SYSTEM: ", palette.dim()),
                Span::styled(view.status, palette.accent().add_modifier(Modifier::BOLD)),
            ]),
            TextLine::styled(view.message.clone(), message_style(&palette, view)),
        ]);
        f.render_widget(Paragraph::new(status), status_area);

        let body = self.body_text(&palette, view);
        let body = Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0));

        if self.preview.is_empty() {
            f.render_widget(body, main_area);
        } else {
            let [preview_area, body_area] =
                Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)])
                    .areas(main_area);
            f.render_widget(&self.preview, preview_area);
            f.render_widget(body, body_area);
        }

        f.render_widget(
            StatusBar {
                message: &self.help_text(view),
                palette: &palette,
            },
            help_area,
        );
    }

    fn body_text(&self, palette: &Palette, view: &View) -> Text<'static> {
        let mut lines: Vec<TextLine<'static>> = view
            .body
            .iter()
            .map(|line| render_line(palette, line, self.selected_quake))
            .collect();

        if let Some(action) = view.action {
            lines.push(TextLine::default());
            lines.push(TextLine::styled(
                format!("[ {} ]", action.label()),
                palette.accent().add_modifier(Modifier::REVERSED),
            ));
        }
        Text::from(lines)
    }

    fn help_text(&self, view: &View) -> String {
        let mut msg = String::new();
        if let Some(action) = view.action {
            msg.push_str(&format!("Enter: {} | ", action.label()));
        } else if self.app.active_tab() == Tab::Ingredients && self.app.is_scanning(Tab::Ingredients) {
            msg.push_str("Enter: CAPTURE IMAGE | ");
        }
        if self.app.active_tab() == Tab::Earthquake {
            msg.push_str("f: force refresh | arrows: details | ");
        }
        if self.app.cameras().len() > 1 {
            msg.push_str("c: switch camera | ");
        }
        msg.push_str(&format!(
            "l: {} | t: theme | Tab: next | q: quit | {}",
            language_name(self.app.language()),
            app_info()
        ));
        msg
    }
}

fn is_quit(key: KeyEvent) -> bool {
    key.code == KeyCode::Char('q')
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

fn message_style(palette: &Palette, view: &View) -> Style {
    let is_error = view
        .body
        .first()
        .is_some_and(|line| *line == Line::Text(view.message.clone()));
    if is_error { palette.error() } else { palette.dim() }
}

fn render_line(palette: &Palette, line: &Line, selected_quake: usize) -> TextLine<'static> {
    match line {
        Line::Heading(text) => {
            TextLine::styled(text.clone(), palette.accent().add_modifier(Modifier::BOLD))
        }
        Line::Text(text) => TextLine::styled(text.clone(), palette.base()),
        Line::Field { label, value } => TextLine::from(vec![
            Span::styled(format!("{}: ", label), palette.dim()),
            Span::styled(value.clone(), palette.base()),
        ]),
        Line::Badge { label, on } => TextLine::from(vec![
            Span::styled(format!("{}: ", label), palette.dim()),
            Span::styled(
                crate::app::presenter::badge_text(*on),
                if *on { palette.ok() } else { palette.error() },
            ),
        ]),
        Line::Bullet { depth, text } => TextLine::styled(
            format!("{}• {}", "  ".repeat(*depth as usize + 1), text),
            palette.base(),
        ),
        Line::Warning(text) => {
            TextLine::styled(format!("⚠ {}", text), palette.error().add_modifier(Modifier::BOLD))
        }
        Line::Entry {
            index,
            expanded,
            title,
        } => {
            let marker = if *expanded { "▾" } else { "▸" };
            let mut style = palette.accent().add_modifier(Modifier::BOLD);
            if *index == selected_quake {
                style = style.add_modifier(Modifier::REVERSED);
            }
            TextLine::styled(format!("{} {}", marker, title), style)
        }
        Line::Blank => TextLine::default(),
    }
}

/// Colours for the dark and light themes
struct Palette {
    fg: Color,
    bg: Color,
    accent: Color,
    dim: Color,
    ok: Color,
    error: Color,
}

impl Palette {
    fn for_theme(theme: AppTheme) -> Self {
        match theme {
            AppTheme::Dark => Self {
                fg: Color::Rgb(0x33, 0xff, 0x66),
                bg: Color::Black,
                accent: Color::Rgb(0x00, 0xff, 0x41),
                dim: Color::Rgb(0x4a, 0x9c, 0x5e),
                ok: Color::Rgb(0x00, 0xff, 0x41),
                error: Color::Rgb(0xff, 0x33, 0x33),
            },
            AppTheme::Light => Self {
                fg: Color::Rgb(0x1a, 0x1a, 0x1a),
                bg: Color::Rgb(0xf5, 0xf5, 0xf0),
                accent: Color::Rgb(0x00, 0x66, 0x33),
                dim: Color::Rgb(0x66, 0x66, 0x66),
                ok: Color::Rgb(0x00, 0x80, 0x3c),
                error: Color::Rgb(0xc0, 0x00, 0x00),
            },
        }
    }

    fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    fn accent(&self) -> Style {
        self.base().fg(self.accent)
    }

    fn dim(&self) -> Style {
        self.base().fg(self.dim)
    }

    fn ok(&self) -> Style {
        self.base().fg(self.ok)
    }

    fn error(&self) -> Style {
        self.base().fg(self.error)
    }
}

/// Camera preview drawn with half-block characters
#[derive(Default)]
struct PreviewWidget {
    /// Sequence and RGB conversion of the frame on screen
    frame: Option<(u64, RgbImage)>,
}

impl PreviewWidget {
    fn update(&mut self, frame: &CameraFrame) {
        if self.frame.as_ref().is_some_and(|(seq, _)| *seq == frame.sequence) {
            return;
        }
        if let Some(rgb) = frame.to_rgb() {
            self.frame = Some((frame.sequence, rgb));
        }
    }

    fn clear(&mut self) {
        self.frame = None;
    }

    fn is_empty(&self) -> bool {
        self.frame.is_none()
    }
}

impl Widget for &PreviewWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some((_, image)) = &self.frame else {
            return;
        };
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 || area.width == 0 || area.height == 0 {
            return;
        }

        // Each terminal cell displays 2 vertical pixels
        let frame_aspect = width as f64 / height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let w = term_height * frame_aspect;
            (w as u16, area.height)
        } else {
            // Terminal is taller - fit to width
            let h = term_width / frame_aspect;
            (area.width, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width - display_width.min(area.width)) / 2;
        let y_offset = area.y + (area.height - display_height.min(area.height)) / 2;

        let x_scale = width as f64 / display_width as f64;
        let y_scale = height as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = ((tx as f64 * x_scale) as u32).min(width - 1);
                let top_y = ((ty as f64 * 2.0 * y_scale) as u32).min(height - 1);
                let bottom_y = (((ty as f64 * 2.0 + 1.0) * y_scale) as u32).min(height - 1);

                let top = image.get_pixel(src_x, top_y).0;
                let bottom = image.get_pixel(src_x, bottom_y).0;

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(Color::Rgb(top[0], top[1], top[2]));
                    cell.set_bg(Color::Rgb(bottom[0], bottom[1], bottom[2]));
                }
            }
        }
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    palette: &'a Palette,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = Style::default().fg(self.palette.bg).bg(self.palette.dim);
        buf.set_style(area, style);

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(area.x, area.y, text, style);
    }
}
