//! Terminal user interface
//!
//! Interactive task-manager view: a live process table and a memory graph,
//! driven by the background collector. The UI thread never samples or waits
//! on process exits itself; it only drains collector events and forwards
//! key presses.

use crate::config::Config;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, prelude::Backend, Terminal};
use std::io;
use std::time::Duration;

mod app;
mod ui;

pub use app::App;

/// Rows moved by PageUp/PageDown
const PAGE_SIZE: usize = 20;

/// Run the TUI application
pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config)?;
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

/// Main event loop: poll keys with a short timeout, apply collector events,
/// redraw. Redrawing at 10 Hz keeps the selection responsive between the
/// slower sampling ticks.
fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    let poll_timeout = Duration::from_millis(100);

    loop {
        app.drain_events();
        terminal.draw(|f| ui::draw(f, app))?;

        if !event::poll(poll_timeout)? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => app.next_tab(),
                KeyCode::BackTab => app.previous_tab(),
                KeyCode::Char('1') => app.set_tab(0),
                KeyCode::Char('2') => app.set_tab(1),
                KeyCode::Left => app.previous_tab(),
                KeyCode::Right => app.next_tab(),
                KeyCode::Up => app.select_previous(),
                KeyCode::Down => app.select_next(),
                KeyCode::PageUp => app.select_page_up(PAGE_SIZE),
                KeyCode::PageDown => app.select_page_down(PAGE_SIZE),
                KeyCode::Home => app.select_first(),
                KeyCode::End => app.select_last(),
                KeyCode::Char('e') | KeyCode::Delete => app.end_selected_task(),
                _ => {}
            }
        }
    }
}
