// src/ui/tui.rs
//! Terminal setup and the main event loop.

use std::{
    io,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossterm::{
    event::{self, Event as CEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use crate::app::App;
use crate::audio::{PlayerFactory, TrackLoader};

/// Redraw interval; the controller changes state in the background.
const TICK_RATE: Duration = Duration::from_millis(200);

/// Run the TUI until the user quits. The terminal is restored even when the
/// loop fails.
pub fn run<L: TrackLoader, F: PlayerFactory>(app: &mut App<L, F>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop<L: TrackLoader, F: PlayerFactory>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<L, F>,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| app.draw(f))?;
        let timeout = TICK_RATE.checked_sub(last_tick.elapsed()).unwrap_or_default();

        if event::poll(timeout)? {
            if let CEvent::Key(key) = event::read()? {
                // Windows reports releases too
                if key.kind == KeyEventKind::Press && app.on_key(key) {
                    info!("Quit requested");
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            last_tick = Instant::now();
        }
    }
}
