//! Board TUI entry point and setup.

use std::{io, path::Path};

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen}
};
use ratatui::{prelude::CrosstermBackend, Terminal};

use crate::config::Config;
use crate::tui::board::BoardApp;

/// Initialise and run the quadrant board.
pub fn run_board_tui(data_dir: &Path, config: &Config) -> io::Result<()> {
    // Load before touching the terminal so a broken data dir reports cleanly.
    let mut app = BoardApp::new(data_dir, config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}
