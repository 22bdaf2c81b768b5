//! # em - Eisenhower Matrix task board
//!
//! A terminal task board that sorts work into the four urgent/important quadrants,
//! with a scriptable CLI and an interactive TUI.
//!
//! ## Key Features
//!
//! - **Four Quadrants**: Do First, Schedule, Delegate, Eliminate
//! - **Undo/Redo**: Every task change is recorded and survives restarts
//! - **Auto-Promotion**: Tasks whose due date arrives move into the urgent row on their own
//! - **Top Priorities**: The three most pressing Do First tasks are ranked
//! - **Weekly Rollover**: `em end-week` writes a plain-text summary and clears finished work
//! - **Goals and Shoutouts**: Track longer-running goals and thank the people who helped
//! - **Local File Storage**: JSON files in one directory, with full-board backup and restore
//!
//! ## Quick Start
//!
//! ```bash
//! # Launch the board
//! em ui
//!
//! # Add a task via CLI
//! em add "Prepare quarterly review" --quadrant q1 --due friday
//!
//! # List tasks by quadrant
//! em list
//!
//! # Finish a delegated task
//! em done "Book meeting room" --delegate Sam
//! ```
//!
//! ## Key Commands
//!
//! - `em ui` - Interactive quadrant board
//! - `em add <title>` - Create a task
//! - `em top` - Ranked top priorities
//! - `em undo` / `em redo` - Step through recent changes
//! - `em end-week` - Close the week and archive a summary
//! - `em export` / `em import` - Full-board JSON backup
//!
//! Data is stored in `~/.eisenhower/` unless `--data-dir` says otherwise. Behaviour can be
//! tuned with `config.toml` in that directory. Set `EM_LOG=debug` for verbose logs.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use chrono::{Local, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod backup;
pub mod classify;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod fields;
pub mod goal;
pub mod history;
pub mod icon;
pub mod rollover;
pub mod storage;
pub mod task;
pub mod tui {
    pub mod board;
    pub mod board_run;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod task_form;
}

use cli::Cli;
use cmd::*;
use config::Config;
use db::Database;
use storage::FileStore;

/// Log file used while the board owns the terminal.
const LOG_FILE: &str = "em.log";

/// Install the global subscriber. `EM_LOG` wins over `RUST_LOG`; the default is `warn`.
/// With `log_file` set, output is appended there instead of stderr.
fn init_tracing(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_env("EM_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let file = log_file.and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Failed to open log file {}: {e}", path.display()))
            .ok()
    });
    match file {
        Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
}

fn main() {
    let cli = Cli::parse();
    let data_dir = config::data_dir(cli.data_dir.as_deref());

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("Failed to create data directory {}: {}", data_dir.display(), e);
        std::process::exit(1);
    }

    // The board owns the terminal, so its logs go to a file.
    if matches!(cli.command, Commands::Ui) {
        init_tracing(Some(&data_dir.join(LOG_FILE)));
        let config = Config::load_or_default(&data_dir);
        cmd_ui(&data_dir, &config);
        return;
    }
    init_tracing(None);

    let config = Config::load_or_default(&data_dir);
    let mut store = match FileStore::open(&data_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open board: {e}");
            std::process::exit(1);
        }
    };
    let mut db = Database::load(&store, &config, Utc::now(), Local::now().date_naive());

    match cli.command {
        Commands::Ui => unreachable!("UI command handled above"),

        Commands::Add { title, desc, quadrant, due, icon, goal } =>
            cmd_add(&mut db, &mut store, title, desc, quadrant, due, icon, goal),

        Commands::List { quadrant, hide_completed } =>
            cmd_list(&mut db, &mut store, quadrant, hide_completed),

        Commands::View { id } => cmd_view(&mut db, &mut store, id),

        Commands::Edit { id, title, desc, clear_desc, quadrant, due, clear_due, icon,
                         delegate, goal, clear_goal } =>
            cmd_edit(&mut db, &mut store, id, title, desc, clear_desc, quadrant, due,
                     clear_due, icon, delegate, goal, clear_goal),

        Commands::Done { id, delegate } => cmd_done(&mut db, &mut store, id, delegate),

        Commands::Move { id, quadrant } => cmd_move(&mut db, &mut store, id, quadrant),

        Commands::Delete { id } => cmd_delete(&mut db, &mut store, id),

        Commands::Undo => cmd_undo(&mut db, &mut store),

        Commands::Redo => cmd_redo(&mut db, &mut store),

        Commands::Top => cmd_top(&mut db, &mut store),

        Commands::EndWeek { no_file } => cmd_end_week(&mut db, &mut store, &config, no_file),

        Commands::History { action } => cmd_history(&mut db, &mut store, action),

        Commands::Shoutout { action } => cmd_shoutout(&mut db, &mut store, action),

        Commands::Goal { action } => cmd_goal(&mut db, &mut store, action),

        Commands::Export { output } => cmd_export(&db, output),

        Commands::Import { input, no_backup } =>
            cmd_import(&mut db, &mut store, input, no_backup),

        Commands::Prefs { font, hide_completed, reset_help, list_fonts } =>
            cmd_prefs(&mut store, font, hide_completed, reset_help, list_fonts),

        Commands::Completions { shell } => cmd_completions(shell),
    }
}
