//! Pivot viewer state and TUI event loop.
//!
//! [`PivotViewer`] owns the theme, the table being shown and the scroll
//! position. Key handling is separate from the terminal loop so it can be
//! driven directly in tests.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, Frame, Terminal};

use pivot_core::models::PivotTable;

use crate::table_view;
use crate::themes::Theme;

/// Rows moved by PgUp / PgDn.
const PAGE_SIZE: usize = 10;

pub struct PivotViewer {
    pub theme: Theme,
    pub title: String,
    pub table: PivotTable,
    /// Index of the first data row on screen.
    pub scroll: usize,
    pub should_quit: bool,
}

impl PivotViewer {
    pub fn new(theme_name: &str, title: impl Into<String>, table: PivotTable) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            title: title.into(),
            table,
            scroll: 0,
            should_quit: false,
        }
    }

    /// Show the table until `q`, `Esc` or `Ctrl+C`, then restore the terminal.
    pub fn run(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_back(1),
            KeyCode::PageDown => self.scroll_by(PAGE_SIZE),
            KeyCode::PageUp => self.scroll_back(PAGE_SIZE),
            KeyCode::Home => self.scroll = 0,
            KeyCode::End => self.scroll = self.max_scroll(),
            _ => {}
        }
    }

    fn scroll_by(&mut self, n: usize) {
        self.scroll = (self.scroll + n).min(self.max_scroll());
    }

    fn scroll_back(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
    }

    /// Last row index that may sit at the top of the screen.
    fn max_scroll(&self) -> usize {
        self.table.rows.len().saturating_sub(1)
    }

    fn render(&self, frame: &mut Frame) {
        let area: Rect = frame.area();
        if self.table.is_empty() {
            table_view::render_no_data(frame, area, &self.theme);
        } else {
            table_view::render_pivot_table(frame, area, &self.title, &self.table, self.scroll, &self.theme);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pivot_core::models::{GroupKey, KeyLayout, PivotRow};
    use pivot_core::period::MonthLabel;
    use ratatui::backend::TestBackend;

    fn table(rows: usize) -> PivotTable {
        PivotTable {
            layout: KeyLayout::Standard,
            months: vec![MonthLabel::new(4).unwrap()],
            rows: (0..rows)
                .map(|i| PivotRow {
                    key: GroupKey {
                        grade: "高1".to_string(),
                        course: format!("講座{i:02}"),
                        teacher: "田中".to_string(),
                        ..Default::default()
                    },
                    counts: vec![1],
                })
                .collect(),
        }
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_keys() {
        for key in [
            press(KeyCode::Char('q')),
            press(KeyCode::Esc),
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        ] {
            let mut viewer = PivotViewer::new("dark", "月次受講人数", table(3));
            viewer.handle_key(key);
            assert!(viewer.should_quit);
        }

        let mut viewer = PivotViewer::new("dark", "月次受講人数", table(3));
        viewer.handle_key(press(KeyCode::Char('c')));
        assert!(!viewer.should_quit);
    }

    #[test]
    fn test_scrolling_is_clamped() {
        let mut viewer = PivotViewer::new("dark", "月次受講人数", table(25));
        viewer.handle_key(press(KeyCode::Up));
        assert_eq!(viewer.scroll, 0);

        viewer.handle_key(press(KeyCode::Down));
        viewer.handle_key(press(KeyCode::PageDown));
        assert_eq!(viewer.scroll, 11);

        viewer.handle_key(press(KeyCode::PageDown));
        viewer.handle_key(press(KeyCode::PageDown));
        assert_eq!(viewer.scroll, 24);

        viewer.handle_key(press(KeyCode::PageUp));
        assert_eq!(viewer.scroll, 14);

        viewer.handle_key(press(KeyCode::Home));
        assert_eq!(viewer.scroll, 0);
        viewer.handle_key(press(KeyCode::End));
        assert_eq!(viewer.scroll, 24);
    }

    #[test]
    fn test_scroll_on_empty_table_stays_at_zero() {
        let mut viewer = PivotViewer::new("classic", "月次受講人数", table(0));
        viewer.handle_key(press(KeyCode::PageDown));
        assert_eq!(viewer.scroll, 0);
    }

    #[test]
    fn test_render_both_states_does_not_panic() {
        for rows in [0, 5] {
            let viewer = PivotViewer::new("light", "月次受講人数", table(rows));
            let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
            terminal.draw(|frame| viewer.render(frame)).unwrap();
        }
    }
}
