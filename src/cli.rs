use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Eisenhower-matrix task board.
/// Storage defaults to ~/.eisenhower or a directory passed via --data-dir.
#[derive(Parser)]
#[command(name = "em", version, about = "Prioritise tasks on an urgent/important matrix")]
pub struct Cli {
    /// Directory holding the board, config.toml and summaries.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
